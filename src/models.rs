use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_ARRIVAL_RATE: f64 = 1.0;
pub const DEFAULT_HORIZON: f64 = 10.0;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct SimConfig {
    pub servers: Vec<ServerConfig>,
    pub arrivals: ArrivalProfile,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    pub name: String,
    pub service_time: f64,
}

/// Where arrival timestamps come from.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum ArrivalProfile {
    /// Fixed, already ordered timestamps.
    Explicit(Vec<f64>),
    /// Poisson arrivals strictly before `horizon`.
    Horizon { rate: f64, horizon: f64 },
    /// Exactly `clients` Poisson arrivals.
    Clients { rate: f64, clients: usize },
}

impl ArrivalProfile {
    pub fn rate(&self) -> Option<f64> {
        match self {
            ArrivalProfile::Explicit(_) => None,
            ArrivalProfile::Horizon { rate, .. } | ArrivalProfile::Clients { rate, .. } => {
                Some(*rate)
            }
        }
    }
}

impl fmt::Display for ArrivalProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrivalProfile::Explicit(times) => write!(f, "explicit ({} clients)", times.len()),
            ArrivalProfile::Horizon { rate, horizon } => {
                write!(f, "poisson (rate: {:.2}, horizon: {:.2})", rate, horizon)
            }
            ArrivalProfile::Clients { rate, clients } => {
                write!(f, "poisson (rate: {:.2}, clients: {})", rate, clients)
            }
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            servers: vec![
                ServerConfig {
                    name: "chair-1".to_string(),
                    service_time: 1.75,
                },
                ServerConfig {
                    name: "chair-2".to_string(),
                    service_time: 1.5,
                },
                ServerConfig {
                    name: "chair-3".to_string(),
                    service_time: 1.0,
                },
            ],
            arrivals: ArrivalProfile::Horizon {
                rate: DEFAULT_ARRIVAL_RATE,
                horizon: DEFAULT_HORIZON,
            },
            seed: None,
        }
    }
}
