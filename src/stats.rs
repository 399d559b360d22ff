use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::events::ClientId;
use crate::server::Server;

/// Where a recorded client currently is.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClientState {
    Waiting,
    InService,
    Departed,
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientState::Waiting => write!(f, "waiting"),
            ClientState::InService => write!(f, "in service"),
            ClientState::Departed => write!(f, "departed"),
        }
    }
}

/// Timeline of one client through the system.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ClientRecord {
    pub id: ClientId,
    pub arrival_time: f64,
    pub start_time: Option<f64>,
    pub departure_time: Option<f64>,
    pub server_id: Option<String>,
}

impl ClientRecord {
    pub fn state(&self) -> ClientState {
        match (self.start_time, self.departure_time) {
            (_, Some(_)) => ClientState::Departed,
            (Some(_), None) => ClientState::InService,
            (None, None) => ClientState::Waiting,
        }
    }

    pub fn wait_time(&self) -> Option<f64> {
        self.start_time.map(|start| start - self.arrival_time)
    }

    pub fn sojourn_time(&self) -> Option<f64> {
        self.departure_time
            .map(|departure| departure - self.arrival_time)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ServerSummary {
    pub name: String,
    pub service_time: f64,
    pub served: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub total_clients: usize,
    pub total_served: usize,
    pub max_queue_length: usize,
    pub mean_wait_time: f64,
    pub mean_sojourn_time: f64,
    pub end_time: f64,
    pub servers: Vec<ServerSummary>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationResult {
    pub summary: SimulationSummary,
    pub clients: Vec<ClientRecord>,
}

/// Per-client accumulator written by the engine while it dispatches events.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    clients: Vec<ClientRecord>,
    index: HashMap<ClientId, usize>,
    max_queue_length: usize,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_arrival(&mut self, id: ClientId, arrival_time: f64) -> Result<()> {
        if self.index.contains_key(&id) {
            return Err(Error::DuplicateClient(id));
        }
        self.index.insert(id, self.clients.len());
        self.clients.push(ClientRecord {
            id,
            arrival_time,
            start_time: None,
            departure_time: None,
            server_id: None,
        });
        Ok(())
    }

    pub fn record_start(&mut self, id: ClientId, server_id: &str, start_time: f64) -> Result<()> {
        let record = self.record_mut(id)?;
        record.start_time = Some(start_time);
        record.server_id = Some(server_id.to_string());
        Ok(())
    }

    pub fn record_departure(&mut self, id: ClientId, departure_time: f64) -> Result<()> {
        self.record_mut(id)?.departure_time = Some(departure_time);
        Ok(())
    }

    /// Raises the peak waiting-line length if `len` exceeds it.
    pub fn observe_queue_length(&mut self, len: usize) {
        self.max_queue_length = self.max_queue_length.max(len);
    }

    pub fn max_queue_length(&self) -> usize {
        self.max_queue_length
    }

    pub fn clients(&self) -> &[ClientRecord] {
        &self.clients
    }

    pub fn client(&self, id: ClientId) -> Option<&ClientRecord> {
        self.index.get(&id).map(|&idx| &self.clients[idx])
    }

    pub fn total_served(&self) -> usize {
        self.clients
            .iter()
            .filter(|record| record.departure_time.is_some())
            .count()
    }

    pub fn summarize(&self, servers: &[Server]) -> SimulationSummary {
        let total_served = self.total_served();
        let (total_wait, total_sojourn, end_time) = self
            .clients
            .iter()
            .filter(|record| record.departure_time.is_some())
            .fold((0.0, 0.0, 0.0_f64), |(wait, sojourn, end), record| {
                (
                    wait + record.wait_time().unwrap_or(0.0),
                    sojourn + record.sojourn_time().unwrap_or(0.0),
                    end.max(record.departure_time.unwrap_or(0.0)),
                )
            });
        let (mean_wait_time, mean_sojourn_time) = if total_served == 0 {
            (0.0, 0.0)
        } else {
            (
                total_wait / total_served as f64,
                total_sojourn / total_served as f64,
            )
        };

        SimulationSummary {
            total_clients: self.clients.len(),
            total_served,
            max_queue_length: self.max_queue_length,
            mean_wait_time,
            mean_sojourn_time,
            end_time,
            servers: servers
                .iter()
                .map(|server| ServerSummary {
                    name: server.id().to_string(),
                    service_time: server.service_time(),
                    served: server.served(),
                })
                .collect(),
        }
    }

    fn record_mut(&mut self, id: ClientId) -> Result<&mut ClientRecord> {
        let idx = *self.index.get(&id).ok_or(Error::UnknownClient(id))?;
        Ok(&mut self.clients[idx])
    }
}
