//! Poll → diff → publish cycle
//!
//! `StatusBridge` owns everything that survives between cycles: the merged
//! snapshot, the last payload handed to the broker and the connection flag.
//! The snapshot is merged into on every successful fetch and never cleared,
//! so a failed or partial dump keeps the previous values.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::broker::{MqttSink, Topics, BRIDGE_QOS, PAYLOAD_ONLINE};
use crate::error::Result;
use crate::parser::{self, LineParser};
use crate::source::StatusSource;

/// Field label → raw value, as last seen in the status output.
pub type StatusSnapshot = BTreeMap<String, String>;

/// What a single publish step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOutcome {
    pub state_sent: bool,
    pub heartbeat_sent: bool,
}

pub struct StatusBridge<S, P, M> {
    source: S,
    parser: P,
    sink: M,
    topics: Topics,
    fields: Vec<String>,
    snapshot: StatusSnapshot,
    prev_payload: Option<String>,
    connected: bool,
}

impl<S, P, M> StatusBridge<S, P, M>
where
    S: StatusSource,
    P: LineParser,
    M: MqttSink,
{
    /// Builds a bridge around an already connected sink.
    pub fn new(source: S, parser: P, sink: M, topics: Topics, fields: Vec<String>) -> Self {
        Self {
            source,
            parser,
            sink,
            topics,
            fields,
            snapshot: StatusSnapshot::new(),
            prev_payload: None,
            connected: true,
        }
    }

    pub fn snapshot(&self) -> &StatusSnapshot {
        &self.snapshot
    }

    pub fn previous_payload(&self) -> Option<&str> {
        self.prev_payload.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Runs the status command and merges the configured fields into the snapshot.
    ///
    /// On failure the error is logged and the snapshot is left as it was.
    pub async fn fetch(&mut self) -> &StatusSnapshot {
        match self.source.dump().await {
            Ok(output) => self.merge(&output),
            Err(e) => error!("Unable to read printer status: {}", e),
        }
        &self.snapshot
    }

    /// Merges one dump of status text, last write wins for repeated labels.
    pub fn merge(&mut self, output: &str) {
        for line in parser::lines(output) {
            let Some(name) = self.parser.candidate_name(line) else {
                continue;
            };
            if !self.fields.contains(&name) {
                continue;
            }
            if let Some((key, value)) = self.parser.parse(line) {
                self.snapshot.insert(key, value);
            }
        }
    }

    /// Publishes the snapshot if it changed, then the presence heartbeat.
    ///
    /// Publish failures are logged and never abort the cycle.
    pub async fn publish(&mut self) -> PublishOutcome {
        let mut outcome = PublishOutcome {
            state_sent: false,
            heartbeat_sent: false,
        };

        match serde_json::to_string(&self.snapshot) {
            Ok(payload) if self.prev_payload.as_deref() != Some(payload.as_str()) => {
                match self.send(&self.topics.state, payload.as_bytes().to_vec()).await {
                    Ok(()) => {
                        debug!("Sending MQTT payload: {}", payload);
                        self.prev_payload = Some(payload);
                        outcome.state_sent = true;
                    }
                    Err(e) => error!("Message send failed: {}", e),
                }
            }
            Ok(_) => {}
            Err(e) => error!("Unable to encode status payload: {}", e),
        }

        match self.send(&self.topics.presence, PAYLOAD_ONLINE.into()).await {
            Ok(()) => outcome.heartbeat_sent = true,
            Err(e) => error!("Message send failed: {}", e),
        }

        outcome
    }

    async fn send(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.sink.send(topic, BRIDGE_QOS, true, payload).await
    }

    /// One fetch + publish pass.
    pub async fn run_cycle(&mut self) -> PublishOutcome {
        self.fetch().await;
        self.publish().await
    }

    /// Polls until the process is stopped; the sleep is fixed, so drift accumulates.
    pub async fn run(&mut self, interval: Duration) {
        info!(
            "Polling every {}s, publishing to {}",
            interval.as_secs(),
            self.topics.state
        );

        while self.is_connected() {
            self.run_cycle().await;
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::parser::HpInfoLayout;
    use rumqttc::QoS;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(String, Vec<u8>)>>>);

    impl MqttSink for Recorder {
        async fn send(&self, topic: &str, _qos: QoS, _retain: bool, payload: Vec<u8>) -> Result<()> {
            self.0.lock().unwrap().push((topic.to_string(), payload));
            Ok(())
        }
    }

    struct Fixed(String);

    impl StatusSource for Fixed {
        async fn dump(&self) -> Result<String> {
            if self.0.is_empty() {
                return Err(BridgeError::SourceOutput("empty".to_string()));
            }
            Ok(self.0.clone())
        }
    }

    fn bridge(output: &str, fields: &[&str]) -> (StatusBridge<Fixed, HpInfoLayout, Recorder>, Recorder) {
        let recorder = Recorder::default();
        let bridge = StatusBridge::new(
            Fixed(output.to_string()),
            HpInfoLayout::default(),
            recorder.clone(),
            Topics::new("ink2mqtt/", "printer"),
            fields.iter().map(|s| s.to_string()).collect(),
        );
        (bridge, recorder)
    }

    fn dump() -> String {
        [
            format!("{:<30}{}", "level", " 42%"),
            format!("{:<30}{}", "status-desc", " Ready"),
            format!("{:<30}{}", "model", "Deskjet"),
        ]
        .join("\n")
    }

    #[tokio::test]
    async fn test_fetch_keeps_configured_fields_only() {
        let (mut bridge, _) = bridge(&dump(), &["level", "status-desc"]);
        let snapshot = bridge.fetch().await.clone();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["level"], " 42%");
        assert_eq!(snapshot["status-desc"], " Ready");
    }

    #[tokio::test]
    async fn test_agent_lines_keyed_by_full_label() {
        let output = [
            format!("{:<30}{}", "agent1-level", "60"),
            format!("{:<30}{}", "agent2-level", "15"),
        ]
        .join("\n");
        let (mut bridge, _) = bridge(&output, &["level"]);
        let snapshot = bridge.fetch().await.clone();

        assert_eq!(snapshot["agent1-level"], "60");
        assert_eq!(snapshot["agent2-level"], "15");
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_snapshot() {
        let (mut bridge, _) = bridge(&dump(), &["level"]);
        bridge.fetch().await;
        bridge.source = Fixed(String::new());

        let snapshot = bridge.fetch().await;
        assert_eq!(snapshot["level"], " 42%");
    }

    #[tokio::test]
    async fn test_unchanged_payload_only_heartbeats() {
        let (mut bridge, recorder) = bridge(&dump(), &["level", "status-desc"]);
        assert!(bridge.is_connected());

        let first = bridge.run_cycle().await;
        let second = bridge.run_cycle().await;

        assert!(first.state_sent && first.heartbeat_sent);
        assert!(!second.state_sent && second.heartbeat_sent);

        let messages = recorder.0.lock().unwrap().clone();
        let topics: Vec<&str> = messages.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(
            topics,
            vec!["ink2mqtt/printer", "ink2mqtt/printer/status", "ink2mqtt/printer/status"]
        );
        assert_eq!(
            String::from_utf8(messages[0].1.clone()).unwrap(),
            r#"{"level":" 42%","status-desc":" Ready"}"#
        );
        assert_eq!(bridge.previous_payload(), Some(r#"{"level":" 42%","status-desc":" Ready"}"#));
    }

    #[tokio::test]
    async fn test_cycles_continue_while_broker_unreachable() {
        // event loop kept alive but never polled: the request queue only fills
        let (client, _eventloop) = rumqttc::AsyncClient::new(
            rumqttc::MqttOptions::new("ink2mqtt-test", "127.0.0.1", 1),
            10,
        );
        let mut bridge = StatusBridge::new(
            Fixed(dump()),
            HpInfoLayout::default(),
            client,
            Topics::new("ink2mqtt/", "printer"),
            vec!["level".to_string()],
        );

        let cycles = async {
            let mut heartbeats = 0;
            for _ in 0..20 {
                if bridge.run_cycle().await.heartbeat_sent {
                    heartbeats += 1;
                }
            }
            heartbeats
        };

        let heartbeats = tokio::time::timeout(std::time::Duration::from_secs(3), cycles)
            .await
            .expect("poll cycle stalled on publish");
        assert!(heartbeats < 20);
        assert_eq!(bridge.previous_payload(), Some(r#"{"level":" 42%"}"#));
    }

    #[tokio::test]
    async fn test_empty_snapshot_is_published_once() {
        let (mut bridge, recorder) = bridge(&dump(), &["bogus"]);
        bridge.run_cycle().await;
        bridge.run_cycle().await;

        let messages = recorder.0.lock().unwrap().clone();
        let states: Vec<_> = messages.iter().filter(|(t, _)| t == "ink2mqtt/printer").collect();
        assert_eq!(states.len(), 1);
        assert_eq!(states[0].1, b"{}".to_vec());
    }
}
