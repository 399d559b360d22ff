pub mod arrivals;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod models;
pub mod output;
pub mod queue;
pub mod server;
pub mod stats;
pub mod waiting_line;
