use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::events::{ClientId, Event};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Idle,
    Busy,
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Idle => write!(f, "idle"),
            ServerStatus::Busy => write!(f, "busy"),
        }
    }
}

/// One service channel with a fixed service time.
///
/// Legal transitions are `Idle -> Busy` through [`Server::start_processing`]
/// and `Busy -> Idle` through [`Server::end_processing`].
#[derive(Clone, Debug)]
pub struct Server {
    id: String,
    service_time: f64,
    status: ServerStatus,
    current_client: Option<ClientId>,
    served: u64,
}

impl Server {
    pub fn new(id: impl Into<String>, service_time: f64) -> Self {
        Self {
            id: id.into(),
            service_time,
            status: ServerStatus::Idle,
            current_client: None,
            served: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn service_time(&self) -> f64 {
        self.service_time
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == ServerStatus::Idle
    }

    pub fn current_client(&self) -> Option<ClientId> {
        self.current_client
    }

    pub fn served(&self) -> u64 {
        self.served
    }

    /// Takes `client_id` into service and returns the departure event to schedule.
    pub fn start_processing(&mut self, client_id: ClientId, start_time: f64) -> Result<Event> {
        if self.status != ServerStatus::Idle {
            return Err(self.invalid_transition(ServerStatus::Idle));
        }
        self.status = ServerStatus::Busy;
        self.current_client = Some(client_id);
        Ok(Event::EndProcessing {
            server_id: self.id.clone(),
            client_id,
            departure_time: start_time + self.service_time,
        })
    }

    pub fn end_processing(&mut self, client_id: ClientId) -> Result<()> {
        if self.status != ServerStatus::Busy {
            return Err(self.invalid_transition(ServerStatus::Busy));
        }
        match self.current_client {
            Some(current) if current != client_id => {
                return Err(Error::ClientMismatch {
                    server: self.id.clone(),
                    expected: client_id,
                    actual: current,
                });
            }
            _ => {}
        }
        self.served += 1;
        self.current_client = None;
        self.status = ServerStatus::Idle;
        Ok(())
    }

    fn invalid_transition(&self, expected: ServerStatus) -> Error {
        Error::InvalidTransition {
            server: self.id.clone(),
            expected,
            actual: self.status,
        }
    }
}
