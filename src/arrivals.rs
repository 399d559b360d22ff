use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{Error, Result};
use crate::models::ArrivalProfile;

/// Poisson arrival times strictly before `horizon`.
pub fn arrivals_until<R: Rng + ?Sized>(rate: f64, horizon: f64, rng: &mut R) -> Vec<f64> {
    let mut arrivals = Vec::new();
    let mut time = 0.0;
    loop {
        time += next_gap(rate, &mut *rng);
        if time >= horizon {
            break;
        }
        arrivals.push(time);
    }
    arrivals
}

/// Exactly `count` Poisson arrival times.
pub fn arrivals_for_clients<R: Rng + ?Sized>(rate: f64, count: usize, rng: &mut R) -> Vec<f64> {
    let mut time = 0.0;
    (0..count)
        .map(|_| {
            time += next_gap(rate, &mut *rng);
            time
        })
        .collect()
}

pub fn build_arrivals(profile: &ArrivalProfile, seed: Option<u64>) -> Result<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(seed.unwrap_or(0));
    match profile {
        ArrivalProfile::Explicit(times) => {
            validate_arrivals(times)?;
            Ok(times.clone())
        }
        ArrivalProfile::Horizon { rate, horizon } => {
            validate_rate(*rate)?;
            if !horizon.is_finite() || *horizon <= 0.0 {
                return Err(Error::InvalidHorizon(*horizon));
            }
            Ok(arrivals_until(*rate, *horizon, &mut rng))
        }
        ArrivalProfile::Clients { rate, clients } => {
            validate_rate(*rate)?;
            if *clients == 0 {
                return Err(Error::ClientsZero);
            }
            Ok(arrivals_for_clients(*rate, *clients, &mut rng))
        }
    }
}

/// Arrival times must be finite, non-negative and non-decreasing.
pub fn validate_arrivals(arrivals: &[f64]) -> Result<()> {
    let mut previous: Option<f64> = None;
    for &time in arrivals {
        if !time.is_finite() || time < 0.0 {
            return Err(Error::InvalidArrival(time.to_string()));
        }
        if let Some(previous) = previous {
            if time < previous {
                return Err(Error::UnorderedArrivals {
                    previous,
                    next: time,
                });
            }
        }
        previous = Some(time);
    }
    Ok(())
}

fn validate_rate(rate: f64) -> Result<()> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(Error::InvalidArrivalRate(rate));
    }
    Ok(())
}

fn next_gap<R: Rng + ?Sized>(rate: f64, rng: &mut R) -> f64 {
    let mut u = rng.gen::<f64>();
    if u <= f64::MIN_POSITIVE {
        u = f64::MIN_POSITIVE;
    }
    -u.ln() / rate
}
