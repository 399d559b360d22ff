use std::collections::VecDeque;

use crate::events::ClientId;

#[derive(Clone, Debug, PartialEq)]
pub struct WaitingClient {
    pub id: ClientId,
    pub arrival_time: f64,
}

/// Clients that arrived while every server was busy, oldest first.
///
/// Arrivals are dispatched in time order, so appending at the back keeps the
/// line sorted by arrival time.
#[derive(Clone, Debug, Default)]
pub struct WaitingLine {
    clients: VecDeque<WaitingClient>,
}

impl WaitingLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, client: WaitingClient) {
        self.clients.push_back(client);
    }

    pub fn pop(&mut self) -> Option<WaitingClient> {
        self.clients.pop_front()
    }

    /// Takes a specific client out of the line, wherever it stands.
    pub fn remove(&mut self, id: ClientId) -> Option<WaitingClient> {
        let idx = self.clients.iter().position(|client| client.id == id)?;
        self.clients.remove(idx)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &WaitingClient> {
        self.clients.iter()
    }
}
