pub type ClientId = usize;

/// Something that happens to a client at a point in simulated time.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Arrival {
        client_id: ClientId,
        arrival_time: f64,
    },
    StartProcessing {
        client_id: ClientId,
        start_time: f64,
    },
    EndProcessing {
        server_id: String,
        client_id: ClientId,
        departure_time: f64,
    },
}

impl Event {
    /// Sort key used by the event queue.
    pub fn time(&self) -> f64 {
        match self {
            Event::Arrival { arrival_time, .. } => *arrival_time,
            Event::StartProcessing { start_time, .. } => *start_time,
            Event::EndProcessing { departure_time, .. } => *departure_time,
        }
    }

    pub fn client_id(&self) -> ClientId {
        match self {
            Event::Arrival { client_id, .. }
            | Event::StartProcessing { client_id, .. }
            | Event::EndProcessing { client_id, .. } => *client_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Arrival { .. } => "arrival",
            Event::StartProcessing { .. } => "start-processing",
            Event::EndProcessing { .. } => "end-processing",
        }
    }
}
