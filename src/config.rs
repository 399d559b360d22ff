use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::arrivals::validate_arrivals;
use crate::error::{Error, Result};
use crate::models::{ArrivalProfile, ServerConfig, SimConfig, DEFAULT_ARRIVAL_RATE, DEFAULT_HORIZON};

#[derive(Parser, Debug)]
#[command(
    name = "queue-sim",
    version,
    about = "Discrete-event simulation of clients queueing for parallel servers"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a simulation and print the report
    Run(RunArgs),
    /// Print the resolved configuration without running it
    ShowConfig(RunArgs),
}

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    #[arg(long, help = "Load configuration from a .toml or .json file")]
    pub config: Option<PathBuf>,
    #[arg(long = "server", value_name = "NAME:SERVICE_TIME")]
    pub server: Vec<String>,
    #[arg(long, value_name = "NAME:SERVICE_TIME,...")]
    pub servers: Option<String>,
    #[arg(long, help = "Mean arrivals per unit of time")]
    pub rate: Option<f64>,
    #[arg(long, conflicts_with_all = ["clients", "arrivals"])]
    pub horizon: Option<f64>,
    #[arg(long, conflicts_with = "arrivals")]
    pub clients: Option<usize>,
    #[arg(long, value_name = "T1,T2,...", help = "Explicit arrival times")]
    pub arrivals: Option<String>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, value_enum, default_value_t = FormatArg::Human)]
    pub format: FormatArg,
    #[arg(short, long, action = ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,
}

#[derive(ValueEnum, Clone, Debug, PartialEq)]
pub enum FormatArg {
    Human,
    Summary,
    Json,
}

pub fn parse_args() -> Result<Cli> {
    Cli::try_parse().map_err(|err| match err.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => err.exit(),
        _ => Error::Cli(err.to_string()),
    })
}

/// Resolves the final configuration: config file (or the built-in default),
/// overridden by any flags given on the command line.
pub fn build_config(args: &RunArgs) -> Result<SimConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => SimConfig::default(),
    };

    let mut servers = Vec::new();
    if let Some(csv) = &args.servers {
        if !csv.trim().is_empty() || args.server.is_empty() {
            servers.extend(parse_servers(csv)?);
        }
    }
    for entry in &args.server {
        servers.push(parse_server(entry)?);
    }
    if !servers.is_empty() {
        config.servers = servers;
    }

    let rate = args
        .rate
        .or_else(|| config.arrivals.rate())
        .unwrap_or(DEFAULT_ARRIVAL_RATE);
    if let Some(arrivals) = &args.arrivals {
        config.arrivals = ArrivalProfile::Explicit(parse_arrivals(arrivals)?);
    } else if let Some(clients) = args.clients {
        config.arrivals = ArrivalProfile::Clients { rate, clients };
    } else if let Some(horizon) = args.horizon {
        config.arrivals = ArrivalProfile::Horizon { rate, horizon };
    } else if args.rate.is_some() {
        config.arrivals = match config.arrivals {
            ArrivalProfile::Clients { clients, .. } => ArrivalProfile::Clients { rate, clients },
            ArrivalProfile::Horizon { horizon, .. } => ArrivalProfile::Horizon { rate, horizon },
            ArrivalProfile::Explicit(_) => ArrivalProfile::Horizon {
                rate,
                horizon: DEFAULT_HORIZON,
            },
        };
    }

    if args.seed.is_some() {
        config.seed = args.seed;
    }

    validate_config(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<SimConfig> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::ConfigIo(format!(
            "failed to read config '{}': {}",
            path.display(),
            err
        ))
    })?;
    let ext = path
        .extension()
        .and_then(|value| value.to_str())
        .unwrap_or("");

    match ext {
        "toml" => toml::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse TOML: {}", err))),
        "json" => serde_json::from_str(&contents)
            .map_err(|err| Error::ConfigParse(format!("failed to parse JSON: {}", err))),
        "" => Err(Error::UnsupportedConfigFormat("unknown".to_string())),
        _ => Err(Error::UnsupportedConfigFormat(ext.to_string())),
    }
}

pub fn validate_config(config: &SimConfig) -> Result<()> {
    if config.servers.is_empty() {
        return Err(Error::EmptyServers);
    }
    let mut names = HashSet::new();
    for server in &config.servers {
        if server.name.trim().is_empty() {
            return Err(Error::InvalidServerEntry(server.name.clone()));
        }
        if !server.service_time.is_finite() || server.service_time <= 0.0 {
            return Err(Error::InvalidServiceTimeValue(server.name.clone()));
        }
        if !names.insert(server.name.as_str()) {
            return Err(Error::DuplicateServerName(server.name.clone()));
        }
    }

    match &config.arrivals {
        ArrivalProfile::Explicit(times) => validate_arrivals(times)?,
        ArrivalProfile::Horizon { rate, horizon } => {
            if !rate.is_finite() || *rate <= 0.0 {
                return Err(Error::InvalidArrivalRate(*rate));
            }
            if !horizon.is_finite() || *horizon <= 0.0 {
                return Err(Error::InvalidHorizon(*horizon));
            }
        }
        ArrivalProfile::Clients { rate, clients } => {
            if !rate.is_finite() || *rate <= 0.0 {
                return Err(Error::InvalidArrivalRate(*rate));
            }
            if *clients == 0 {
                return Err(Error::ClientsZero);
            }
        }
    }

    Ok(())
}

pub fn parse_servers(input: &str) -> Result<Vec<ServerConfig>> {
    if input.trim().is_empty() {
        return Err(Error::EmptyServers);
    }
    input.split(',').map(parse_server).collect()
}

fn parse_server(entry: &str) -> Result<ServerConfig> {
    let trimmed = entry.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyServerEntry);
    }

    let mut parts = trimmed.split(':');
    let name = parts.next().unwrap_or("").trim();
    let service_str = parts.next().unwrap_or("").trim();
    if parts.next().is_some() || name.is_empty() || service_str.is_empty() {
        return Err(Error::InvalidServerEntry(trimmed.to_string()));
    }

    let service_time: f64 = service_str
        .parse()
        .map_err(|_| Error::InvalidServiceTime(trimmed.to_string()))?;
    if !service_time.is_finite() || service_time <= 0.0 {
        return Err(Error::InvalidServiceTimeValue(trimmed.to_string()));
    }

    Ok(ServerConfig {
        name: name.to_string(),
        service_time,
    })
}

pub fn parse_arrivals(input: &str) -> Result<Vec<f64>> {
    let times = input
        .split(',')
        .map(|entry| {
            let trimmed = entry.trim();
            trimmed
                .parse::<f64>()
                .map_err(|_| Error::InvalidArrival(trimmed.to_string()))
        })
        .collect::<Result<Vec<f64>>>()?;
    validate_arrivals(&times)?;
    Ok(times)
}
