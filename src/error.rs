use thiserror::Error;

use crate::server::ServerStatus;
use crate::stats::ClientState;

#[derive(Error, Debug, PartialEq)]
pub enum Error {
    #[error("pop on an empty event queue")]
    EmptyQueue,
    #[error("queue entry is no longer scheduled")]
    UnknownEntry,
    #[error("server '{server}' must be {expected} but is {actual}")]
    InvalidTransition {
        server: String,
        expected: ServerStatus,
        actual: ServerStatus,
    },
    #[error("server '{server}' is serving client {actual}, not client {expected}")]
    ClientMismatch {
        server: String,
        expected: usize,
        actual: usize,
    },
    #[error("no idle server for client {client}")]
    NoIdleServer { client: usize },
    #[error("unknown server '{0}'")]
    UnknownServer(String),
    #[error("unknown client {0}")]
    UnknownClient(usize),
    #[error("client {client} cannot start while {state}")]
    InvalidClientState { client: usize, state: ClientState },
    #[error("client {0} already arrived")]
    DuplicateClient(usize),
    #[error("servers must not be empty")]
    EmptyServers,
    #[error("servers must not contain empty entries")]
    EmptyServerEntry,
    #[error("duplicate server name '{0}'")]
    DuplicateServerName(String),
    #[error("invalid server entry '{0}': expected name:service_time")]
    InvalidServerEntry(String),
    #[error("invalid service time in '{0}'")]
    InvalidServiceTime(String),
    #[error("service time must be > 0 in '{0}'")]
    InvalidServiceTimeValue(String),
    #[error("arrival rate must be > 0 (got {0})")]
    InvalidArrivalRate(f64),
    #[error("horizon must be > 0 (got {0})")]
    InvalidHorizon(f64),
    #[error("clients must be greater than 0")]
    ClientsZero,
    #[error("invalid arrival time '{0}'")]
    InvalidArrival(String),
    #[error("arrival times must be non-decreasing ({previous} then {next})")]
    UnorderedArrivals { previous: f64, next: f64 },
    #[error("{0}")]
    ConfigIo(String),
    #[error("{0}")]
    ConfigParse(String),
    #[error("unsupported config format '{0}'")]
    UnsupportedConfigFormat(String),
    #[error("{0}")]
    Output(String),
    #[error("{0}")]
    Cli(String),
}

pub type Result<T> = std::result::Result<T, Error>;
