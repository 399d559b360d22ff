use std::fmt::Write;

use crate::error::{Error, Result};
use crate::models::SimConfig;
use crate::stats::{ClientRecord, SimulationResult};

pub trait Formatter {
    fn write(&self, result: &SimulationResult) -> Result<String>;
}

pub struct HumanFormatter;
pub struct SummaryFormatter;
pub struct JsonFormatter;

impl Formatter for HumanFormatter {
    fn write(&self, result: &SimulationResult) -> Result<String> {
        let mut out = String::new();
        out.push_str("Clients:\n");
        for client in &result.clients {
            push_line(&mut out, &client_line(client));
        }
        write_summary(&mut out, result);
        Ok(out)
    }
}

impl Formatter for SummaryFormatter {
    fn write(&self, result: &SimulationResult) -> Result<String> {
        let mut out = String::new();
        write_summary(&mut out, result);
        Ok(out)
    }
}

impl Formatter for JsonFormatter {
    fn write(&self, result: &SimulationResult) -> Result<String> {
        let mut out = serde_json::to_string_pretty(result)
            .map_err(|err| Error::Output(format!("failed to serialize result: {}", err)))?;
        out.push('\n');
        Ok(out)
    }
}

pub fn describe_config(config: &SimConfig) -> String {
    let mut out = String::new();
    out.push_str("Servers:\n");
    for server in &config.servers {
        push_line(
            &mut out,
            &format!(
                "- {} (service time: {:.2})",
                server.name, server.service_time
            ),
        );
    }
    push_line(&mut out, &format!("Arrivals: {}", config.arrivals));
    match config.seed {
        Some(seed) => push_line(&mut out, &format!("Seed: {}", seed)),
        None => push_line(&mut out, "Seed: none"),
    }
    out
}

fn client_line(client: &ClientRecord) -> String {
    let mut line = format!(
        "Client {}: arrived {:.2}",
        client.id, client.arrival_time
    );
    if let (Some(start), Some(server)) = (client.start_time, &client.server_id) {
        let _ = write!(line, ", started {:.2} on {}", start, server);
    }
    match client.departure_time {
        Some(departure) => {
            let _ = write!(line, ", left {:.2}", departure);
        }
        None => line.push_str(", not served"),
    }
    line
}

fn write_summary(out: &mut String, result: &SimulationResult) {
    let summary = &result.summary;
    out.push_str("Summary:\n");
    push_line(
        out,
        &format!(
            "clients served: {}/{}",
            summary.total_served, summary.total_clients
        ),
    );
    push_line(
        out,
        &format!("max queue length: {}", summary.max_queue_length),
    );
    push_line(out, &format!("mean wait: {:.2}", summary.mean_wait_time));
    push_line(
        out,
        &format!("mean sojourn: {:.2}", summary.mean_sojourn_time),
    );
    push_line(out, &format!("end time: {:.2}", summary.end_time));
    out.push_str("Servers:\n");
    for server in &summary.servers {
        push_line(
            out,
            &format!(
                "{}: {} clients (service time: {:.2})",
                server.name, server.served, server.service_time
            ),
        );
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::{ServerSummary, SimulationSummary};

    fn sample() -> SimulationResult {
        SimulationResult {
            summary: SimulationSummary {
                total_clients: 2,
                total_served: 1,
                max_queue_length: 1,
                mean_wait_time: 0.0,
                mean_sojourn_time: 1.5,
                end_time: 1.5,
                servers: vec![ServerSummary {
                    name: "a".to_string(),
                    service_time: 1.5,
                    served: 1,
                }],
            },
            clients: vec![
                ClientRecord {
                    id: 1,
                    arrival_time: 0.0,
                    start_time: Some(0.0),
                    departure_time: Some(1.5),
                    server_id: Some("a".to_string()),
                },
                ClientRecord {
                    id: 2,
                    arrival_time: 0.25,
                    start_time: None,
                    departure_time: None,
                    server_id: None,
                },
            ],
        }
    }

    #[test]
    fn human_output_lists_clients_then_summary() {
        let expected = concat!(
            "Clients:\n",
            "Client 1: arrived 0.00, started 0.00 on a, left 1.50\n",
            "Client 2: arrived 0.25, not served\n",
            "Summary:\n",
            "clients served: 1/2\n",
            "max queue length: 1\n",
            "mean wait: 0.00\n",
            "mean sojourn: 1.50\n",
            "end time: 1.50\n",
            "Servers:\n",
            "a: 1 clients (service time: 1.50)\n",
        );
        assert_eq!(HumanFormatter.write(&sample()).unwrap(), expected);
    }

    #[test]
    fn summary_output_omits_clients() {
        let out = SummaryFormatter.write(&sample()).unwrap();
        assert!(out.starts_with("Summary:\n"));
        assert!(!out.contains("Client 1"));
    }

    #[test]
    fn json_output_round_trips_through_value() {
        let out = JsonFormatter.write(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["summary"]["max_queue_length"], 1);
        assert_eq!(value["clients"][1]["departure_time"], serde_json::Value::Null);
    }
}
