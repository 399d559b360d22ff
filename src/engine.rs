use std::collections::HashMap;

use log::{debug, info, trace};

use crate::arrivals::{build_arrivals, validate_arrivals};
use crate::config::validate_config;
use crate::error::{Error, Result};
use crate::events::{ClientId, Event};
use crate::models::{ServerConfig, SimConfig};
use crate::queue::{EntryId, EventQueue};
use crate::server::Server;
use crate::stats::{ClientState, SimulationResult, Statistics};
use crate::waiting_line::{WaitingClient, WaitingLine};

/// State change produced by dispatching a single event.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// An arriving client went straight to an idle server.
    Assigned {
        client_id: ClientId,
        server_id: String,
        start_time: f64,
        departure_time: f64,
    },
    /// Every server was busy; the client joined the waiting line.
    Queued { client_id: ClientId, queue_len: usize },
    Started {
        client_id: ClientId,
        server_id: String,
        start_time: f64,
        departure_time: f64,
    },
    /// A client left. `handoff` is the start event issued for the next
    /// waiting client on the freed server, if anyone was waiting.
    Departed {
        client_id: ClientId,
        server_id: String,
        departure_time: f64,
        handoff: Option<Event>,
    },
}

pub struct SimulationEngine {
    queue: EventQueue<Event>,
    servers: Vec<Server>,
    server_index: HashMap<String, usize>,
    waiting: WaitingLine,
    stats: Statistics,
    time: f64,
    last_client_id: ClientId,
}

impl Default for SimulationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationEngine {
    pub fn new() -> Self {
        Self {
            queue: EventQueue::new(),
            servers: Vec::new(),
            server_index: HashMap::new(),
            waiting: WaitingLine::new(),
            stats: Statistics::new(),
            time: 0.0,
            last_client_id: 0,
        }
    }

    pub fn with_servers(servers: &[ServerConfig]) -> Result<Self> {
        let mut engine = Self::new();
        for server in servers {
            engine.add_server(&server.name, server.service_time)?;
        }
        Ok(engine)
    }

    /// Registers a server. Servers are scanned in the order they were added.
    pub fn add_server(&mut self, id: &str, service_time: f64) -> Result<()> {
        if id.trim().is_empty() {
            return Err(Error::InvalidServerEntry(id.to_string()));
        }
        if !service_time.is_finite() || service_time <= 0.0 {
            return Err(Error::InvalidServiceTimeValue(id.to_string()));
        }
        if self.server_index.contains_key(id) {
            return Err(Error::DuplicateServerName(id.to_string()));
        }
        self.server_index.insert(id.to_string(), self.servers.len());
        self.servers.push(Server::new(id, service_time));
        Ok(())
    }

    /// Timestamp of the most recently popped event.
    pub fn now(&self) -> f64 {
        self.time
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn server(&self, id: &str) -> Option<&Server> {
        self.server_index.get(id).map(|&idx| &self.servers[idx])
    }

    pub fn waiting_line(&self) -> &WaitingLine {
        &self.waiting
    }

    pub fn statistics(&self) -> &Statistics {
        &self.stats
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// Schedules `event` at its own timestamp. Ordering against the current
    /// time is left to the queue.
    pub fn inject_event(&mut self, event: Event) -> EntryId {
        if let Event::Arrival { client_id, .. } = &event {
            self.last_client_id = self.last_client_id.max(*client_id);
        }
        let time = event.time();
        self.queue.push(event, time)
    }

    /// Pops the earliest pending event and dispatches it. Returns `None` once
    /// no events remain.
    pub fn step(&mut self) -> Result<Option<Outcome>> {
        if self.queue.is_empty() {
            return Ok(None);
        }
        let entry = self.queue.pop()?;
        self.time = entry.priority;
        self.dispatch(entry.payload).map(Some)
    }

    pub fn dispatch(&mut self, event: Event) -> Result<Outcome> {
        match event {
            Event::Arrival {
                client_id,
                arrival_time,
            } => self.on_arrival(client_id, arrival_time),
            Event::StartProcessing {
                client_id,
                start_time,
            } => {
                let idx = self
                    .servers
                    .iter()
                    .position(Server::is_idle)
                    .ok_or(Error::NoIdleServer { client: client_id })?;
                if self.waiting.remove(client_id).is_none() {
                    let state = self
                        .stats
                        .client(client_id)
                        .ok_or(Error::UnknownClient(client_id))?
                        .state();
                    return Err(Error::InvalidClientState {
                        client: client_id,
                        state,
                    });
                }
                let (server_id, departure_time) = self.start_on(idx, client_id, start_time)?;
                Ok(Outcome::Started {
                    client_id,
                    server_id,
                    start_time,
                    departure_time,
                })
            }
            Event::EndProcessing {
                server_id,
                client_id,
                departure_time,
            } => self.on_departure(server_id, client_id, departure_time),
        }
    }

    /// Feeds `arrivals` in as clients with ids following the highest id seen
    /// so far and runs until no events remain.
    pub fn run(&mut self, arrivals: &[f64]) -> Result<SimulationResult> {
        if self.servers.is_empty() {
            return Err(Error::EmptyServers);
        }
        validate_arrivals(arrivals)?;

        for &arrival_time in arrivals {
            self.last_client_id += 1;
            self.inject_event(Event::Arrival {
                client_id: self.last_client_id,
                arrival_time,
            });
        }
        debug!(
            "injected {} arrivals across {} servers",
            arrivals.len(),
            self.servers.len()
        );

        while let Some(outcome) = self.step()? {
            log_outcome(self.time, &outcome);
        }

        let result = self.result();
        info!(
            "served {} of {} clients, max queue length {}, mean sojourn {:.2}",
            result.summary.total_served,
            result.summary.total_clients,
            result.summary.max_queue_length,
            result.summary.mean_sojourn_time
        );
        Ok(result)
    }

    pub fn result(&self) -> SimulationResult {
        SimulationResult {
            summary: self.stats.summarize(&self.servers),
            clients: self.stats.clients().to_vec(),
        }
    }

    fn on_arrival(&mut self, client_id: ClientId, arrival_time: f64) -> Result<Outcome> {
        self.stats.record_arrival(client_id, arrival_time)?;
        self.last_client_id = self.last_client_id.max(client_id);

        match self.least_served_idle() {
            Some(idx) => {
                let (server_id, departure_time) = self.start_on(idx, client_id, arrival_time)?;
                Ok(Outcome::Assigned {
                    client_id,
                    server_id,
                    start_time: arrival_time,
                    departure_time,
                })
            }
            None => {
                self.waiting.push(WaitingClient {
                    id: client_id,
                    arrival_time,
                });
                let queue_len = self.waiting.len();
                self.stats.observe_queue_length(queue_len);
                Ok(Outcome::Queued {
                    client_id,
                    queue_len,
                })
            }
        }
    }

    fn on_departure(
        &mut self,
        server_id: String,
        client_id: ClientId,
        departure_time: f64,
    ) -> Result<Outcome> {
        let idx = *self
            .server_index
            .get(&server_id)
            .ok_or_else(|| Error::UnknownServer(server_id.clone()))?;
        if self.stats.client(client_id).is_none() {
            return Err(Error::UnknownClient(client_id));
        }
        self.servers[idx].end_processing(client_id)?;
        self.stats.record_departure(client_id, departure_time)?;

        let handoff = match self.waiting.pop() {
            Some(next) => {
                self.start_on(idx, next.id, departure_time)?;
                Some(Event::StartProcessing {
                    client_id: next.id,
                    start_time: departure_time,
                })
            }
            None => None,
        };

        Ok(Outcome::Departed {
            client_id,
            server_id,
            departure_time,
            handoff,
        })
    }

    /// Idle server with the fewest clients served; the earliest added wins ties.
    fn least_served_idle(&self) -> Option<usize> {
        let mut selected: Option<usize> = None;
        for (idx, server) in self.servers.iter().enumerate() {
            if !server.is_idle() {
                continue;
            }
            match selected {
                Some(current) if self.servers[current].served() <= server.served() => {}
                _ => selected = Some(idx),
            }
        }
        selected
    }

    fn start_on(
        &mut self,
        idx: usize,
        client_id: ClientId,
        start_time: f64,
    ) -> Result<(String, f64)> {
        let state = self
            .stats
            .client(client_id)
            .ok_or(Error::UnknownClient(client_id))?
            .state();
        if state != ClientState::Waiting {
            return Err(Error::InvalidClientState {
                client: client_id,
                state,
            });
        }
        let server = &mut self.servers[idx];
        let departure = server.start_processing(client_id, start_time)?;
        let server_id = server.id().to_string();
        let departure_time = departure.time();
        self.stats.record_start(client_id, &server_id, start_time)?;
        self.inject_event(departure);
        Ok((server_id, departure_time))
    }
}

pub fn run_simulation(config: &SimConfig) -> Result<SimulationResult> {
    validate_config(config)?;
    let arrivals = build_arrivals(&config.arrivals, config.seed)?;
    let mut engine = SimulationEngine::with_servers(&config.servers)?;
    engine.run(&arrivals)
}

fn log_outcome(time: f64, outcome: &Outcome) {
    match outcome {
        Outcome::Assigned {
            client_id,
            server_id,
            departure_time,
            ..
        } => debug!(
            "[{:.2}] client {} assigned to {} until {:.2}",
            time, client_id, server_id, departure_time
        ),
        Outcome::Queued {
            client_id,
            queue_len,
        } => debug!(
            "[{:.2}] client {} waits (queue length: {})",
            time, client_id, queue_len
        ),
        Outcome::Started {
            client_id,
            server_id,
            ..
        } => debug!("[{:.2}] client {} started on {}", time, client_id, server_id),
        Outcome::Departed {
            client_id,
            server_id,
            handoff,
            ..
        } => {
            debug!("[{:.2}] client {} left {}", time, client_id, server_id);
            if let Some(event) = handoff {
                trace!(
                    "[{:.2}] {} event for client {} on {}",
                    time,
                    event.kind(),
                    event.client_id(),
                    server_id
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArrivalProfile;
    use crate::server::ServerStatus;

    fn engine_with(servers: &[(&str, f64)]) -> SimulationEngine {
        let mut engine = SimulationEngine::new();
        for (name, service_time) in servers {
            engine
                .add_server(name, *service_time)
                .expect("server should be valid");
        }
        engine
    }

    fn drain(engine: &mut SimulationEngine) -> Vec<f64> {
        let mut times = Vec::new();
        while engine.step().expect("step should succeed").is_some() {
            times.push(engine.now());
        }
        times
    }

    #[test]
    fn single_server_saturation() {
        let mut engine = engine_with(&[("solo", 2.0)]);
        let result = engine.run(&[0.0, 0.1]).expect("run should succeed");

        let first = &result.clients[0];
        assert_eq!(first.start_time, Some(0.0));
        assert_eq!(first.departure_time, Some(2.0));
        let second = &result.clients[1];
        assert_eq!(second.arrival_time, 0.1);
        assert_eq!(second.start_time, Some(2.0));
        assert_eq!(second.departure_time, Some(4.0));

        assert_eq!(result.summary.max_queue_length, 1);
        assert_eq!(result.summary.total_served, 2);
        assert_eq!(result.summary.end_time, 4.0);
    }

    #[test]
    fn arrival_prefers_least_served_idle_server() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0), ("c", 1.0)]);
        engine.run(&[0.0]).expect("run should succeed");
        assert_eq!(engine.server("a").map(Server::served), Some(1));

        let outcome = engine
            .dispatch(Event::Arrival {
                client_id: 2,
                arrival_time: 5.0,
            })
            .expect("dispatch should succeed");
        match outcome {
            Outcome::Assigned { server_id, .. } => assert_eq!(server_id, "b"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn arrival_never_goes_to_busy_server() {
        let mut engine = engine_with(&[("a", 10.0), ("b", 10.0), ("c", 10.0)]);
        engine.run(&[0.0, 0.0, 0.0]).expect("run should succeed");

        engine.inject_event(Event::Arrival {
            client_id: 4,
            arrival_time: 20.0,
        });
        engine.inject_event(Event::Arrival {
            client_id: 5,
            arrival_time: 20.0,
        });
        assert!(matches!(
            engine.step().unwrap(),
            Some(Outcome::Assigned { ref server_id, .. }) if server_id == "a"
        ));
        assert!(matches!(
            engine.step().unwrap(),
            Some(Outcome::Assigned { ref server_id, .. }) if server_id == "b"
        ));
        assert_eq!(engine.server("a").map(Server::status), Some(ServerStatus::Busy));
    }

    #[test]
    fn departure_hands_waiting_client_to_freed_server() {
        let mut engine = engine_with(&[("solo", 3.0)]);
        for client_id in 1..=3 {
            engine.inject_event(Event::Arrival {
                client_id,
                arrival_time: 0.0,
            });
        }
        for _ in 0..3 {
            engine.step().unwrap();
        }
        assert_eq!(engine.waiting_line().len(), 2);

        let outcome = engine.step().unwrap();
        assert_eq!(
            outcome,
            Some(Outcome::Departed {
                client_id: 1,
                server_id: "solo".to_string(),
                departure_time: 3.0,
                handoff: Some(Event::StartProcessing {
                    client_id: 2,
                    start_time: 3.0,
                }),
            })
        );
        assert_eq!(engine.waiting_line().len(), 1);
        assert_eq!(engine.server("solo").map(Server::current_client), Some(Some(2)));
        assert_eq!(
            engine.statistics().client(2).and_then(|c| c.start_time),
            Some(3.0)
        );
    }

    #[test]
    fn start_processing_event_takes_waiting_client_off_the_line() {
        let mut engine = engine_with(&[("a", 1.0)]);
        for client_id in 1..=2 {
            engine
                .dispatch(Event::Arrival {
                    client_id,
                    arrival_time: 0.0,
                })
                .unwrap();
        }
        assert_eq!(engine.waiting_line().len(), 1);
        engine.add_server("b", 2.0).unwrap();

        let outcome = engine
            .dispatch(Event::StartProcessing {
                client_id: 2,
                start_time: 0.5,
            })
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Started {
                client_id: 2,
                server_id: "b".to_string(),
                start_time: 0.5,
                departure_time: 2.5,
            }
        );
        assert!(engine.waiting_line().is_empty());
        assert_eq!(engine.server("b").map(Server::current_client), Some(Some(2)));
    }

    #[test]
    fn start_processing_for_client_in_service_fails() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        engine
            .dispatch(Event::Arrival {
                client_id: 1,
                arrival_time: 0.0,
            })
            .unwrap();

        let err = engine
            .dispatch(Event::StartProcessing {
                client_id: 1,
                start_time: 0.0,
            })
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidClientState {
                client: 1,
                state: ClientState::InService,
            }
        );
        assert_eq!(engine.server("b").map(Server::status), Some(ServerStatus::Idle));
        assert_eq!(engine.pending_events(), 1);
    }

    #[test]
    fn start_processing_for_departed_client_fails() {
        let mut engine = engine_with(&[("a", 1.0), ("b", 1.0)]);
        engine
            .dispatch(Event::Arrival {
                client_id: 2,
                arrival_time: 0.0,
            })
            .unwrap();
        engine
            .dispatch(Event::EndProcessing {
                server_id: "a".to_string(),
                client_id: 2,
                departure_time: 1.0,
            })
            .unwrap();

        let err = engine
            .dispatch(Event::StartProcessing {
                client_id: 2,
                start_time: 1.5,
            })
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidClientState {
                client: 2,
                state: ClientState::Departed,
            }
        );
        let record = engine.statistics().client(2).unwrap();
        assert_eq!(record.start_time, Some(0.0));
        assert_eq!(record.departure_time, Some(1.0));
    }

    #[test]
    fn run_continues_after_hand_dispatched_arrivals() {
        let mut engine = engine_with(&[("a", 1.0)]);
        engine
            .dispatch(Event::Arrival {
                client_id: 3,
                arrival_time: 0.0,
            })
            .unwrap();

        let result = engine.run(&[2.0]).unwrap();
        let ids: Vec<ClientId> = result.clients.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(result.summary.total_served, 2);
    }

    #[test]
    fn short_horizon_without_arrivals_runs_empty() {
        let config = SimConfig {
            arrivals: ArrivalProfile::Horizon {
                rate: 1e-9,
                horizon: 0.5,
            },
            seed: Some(0),
            ..SimConfig::default()
        };
        let result = run_simulation(&config).expect("simulation should succeed");

        assert_eq!(result.summary.total_clients, 0);
        assert_eq!(result.summary.total_served, 0);
        assert_eq!(result.summary.mean_sojourn_time, 0.0);
    }

    #[test]
    fn start_processing_without_idle_server_fails() {
        let mut engine = engine_with(&[("a", 1.0)]);
        engine
            .dispatch(Event::Arrival {
                client_id: 1,
                arrival_time: 0.0,
            })
            .unwrap();

        let err = engine
            .dispatch(Event::StartProcessing {
                client_id: 1,
                start_time: 0.0,
            })
            .unwrap_err();
        assert_eq!(err, Error::NoIdleServer { client: 1 });
    }

    #[test]
    fn end_processing_on_idle_server_is_invalid() {
        let mut engine = engine_with(&[("a", 1.0)]);
        engine
            .dispatch(Event::Arrival {
                client_id: 1,
                arrival_time: 0.0,
            })
            .unwrap();
        engine
            .dispatch(Event::EndProcessing {
                server_id: "a".to_string(),
                client_id: 1,
                departure_time: 1.0,
            })
            .unwrap();

        let err = engine
            .dispatch(Event::EndProcessing {
                server_id: "a".to_string(),
                client_id: 1,
                departure_time: 1.0,
            })
            .unwrap_err();
        assert_eq!(
            err,
            Error::InvalidTransition {
                server: "a".to_string(),
                expected: ServerStatus::Busy,
                actual: ServerStatus::Idle,
            }
        );
    }

    #[test]
    fn end_processing_for_unknown_server_fails() {
        let mut engine = engine_with(&[("a", 1.0)]);
        let err = engine
            .dispatch(Event::EndProcessing {
                server_id: "ghost".to_string(),
                client_id: 1,
                departure_time: 1.0,
            })
            .unwrap_err();
        assert_eq!(err, Error::UnknownServer("ghost".to_string()));
    }

    #[test]
    fn step_times_never_decrease() {
        let mut engine = engine_with(&[("a", 1.75), ("b", 1.5), ("c", 1.0)]);
        let arrivals = build_arrivals(
            &ArrivalProfile::Clients {
                rate: 2.0,
                clients: 200,
            },
            Some(3),
        )
        .unwrap();
        for (idx, &arrival_time) in arrivals.iter().enumerate() {
            engine.inject_event(Event::Arrival {
                client_id: idx + 1,
                arrival_time,
            });
        }

        let times = drain(&mut engine);
        assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(engine.pending_events(), 0);
    }

    #[test]
    fn every_arrival_is_served() {
        let config = SimConfig {
            seed: Some(42),
            ..SimConfig::default()
        };
        let arrivals = build_arrivals(&config.arrivals, config.seed).unwrap();
        let result = run_simulation(&config).expect("simulation should succeed");

        assert_eq!(result.summary.total_clients, arrivals.len());
        assert_eq!(result.summary.total_served, arrivals.len());
        let served: u64 = result.summary.servers.iter().map(|s| s.served).sum();
        assert_eq!(served as usize, arrivals.len());
        assert!(result
            .clients
            .iter()
            .all(|c| c.start_time.unwrap() >= c.arrival_time
                && c.departure_time.unwrap() > c.start_time.unwrap()));
    }

    #[test]
    fn repeated_runs_continue_client_ids() {
        let mut engine = engine_with(&[("a", 1.0)]);
        engine.run(&[0.0]).unwrap();
        let result = engine.run(&[5.0]).unwrap();

        let ids: Vec<ClientId> = result.clients.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(result.summary.total_served, 2);
    }

    #[test]
    fn empty_arrivals_produce_zero_summary() {
        let mut engine = engine_with(&[("a", 1.0)]);
        let result = engine.run(&[]).unwrap();
        assert_eq!(result.summary.total_served, 0);
        assert_eq!(result.summary.mean_sojourn_time, 0.0);
    }

    #[test]
    fn run_without_servers_fails() {
        let mut engine = SimulationEngine::new();
        assert_eq!(engine.run(&[0.0]).unwrap_err(), Error::EmptyServers);
    }

    #[test]
    fn run_rejects_unordered_arrivals() {
        let mut engine = engine_with(&[("a", 1.0)]);
        let err = engine.run(&[1.0, 0.5]).unwrap_err();
        assert_eq!(
            err,
            Error::UnorderedArrivals {
                previous: 1.0,
                next: 0.5,
            }
        );
        assert_eq!(engine.pending_events(), 0);
    }

    #[test]
    fn add_server_validates_input() {
        let mut engine = engine_with(&[("a", 1.0)]);
        assert_eq!(
            engine.add_server("a", 2.0).unwrap_err(),
            Error::DuplicateServerName("a".to_string())
        );
        assert_eq!(
            engine.add_server("b", 0.0).unwrap_err(),
            Error::InvalidServiceTimeValue("b".to_string())
        );
        assert!(engine.add_server(" ", 1.0).is_err());
    }
}
