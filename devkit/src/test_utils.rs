/*!
Test harness pour le pont ink2mqtt

Facilite l'écriture de tests avec:
- Construction de sorties `hp-info -i` au format colonnes fixes
- Pont câblé sur le client MQTT simulé et une source scriptée
- Accès direct aux messages d'état et de présence
- Capture des logs tracing pour compter avertissements et erreurs
*/

use parking_lot::Mutex;
use std::io;
use std::sync::Arc;

use ink2mqtt::parser::VALUE_COLUMN;
use ink2mqtt::{HpInfoLayout, StatusBridge, Topics};

use crate::mqtt_stub::{MockMessage, MockMqttClient};
use crate::source_stub::ScriptedSource;

/// Builder for fixed-column `hp-info -i` output
#[derive(Debug, Clone, Default)]
pub struct HpInfoFixture {
    lines: Vec<String>,
}

impl HpInfoFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label padded to the value column, then `value` verbatim
    pub fn field(mut self, label: &str, value: &str) -> Self {
        self.lines.push(format!("{:<width$}{}", label, value, width = VALUE_COLUMN));
        self
    }

    /// Line copied as-is (headers, blank lines, odd layouts)
    pub fn raw(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    pub fn build(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Typical dump of a single-cartridge inkjet
    pub fn deskjet() -> Self {
        Self::new()
            .raw("HP Linux Imaging and Printing System (ver. 3.22.10)")
            .raw("")
            .field("model", "Deskjet_3630_series")
            .field("serial", "CN12345678")
            .field("status-code", "1000")
            .field("status-desc", " Ready")
            .field("agent1-desc", "Black cartridge")
            .field("agent1-health-desc", "Good/OK")
            .field("agent1-level", "60")
            .field("agent2-desc", "Tri-color cartridge")
            .field("agent2-health-desc", "Good/OK")
            .field("agent2-level", "25")
    }
}

pub type MockBridge = StatusBridge<ScriptedSource, HpInfoLayout, MockMqttClient>;

/// Bridge wired to mocks, plus handles to inspect them
pub struct TestHarness {
    pub bridge: MockBridge,
    pub source: ScriptedSource,
    pub mqtt_client: MockMqttClient,
    pub topics: Topics,
}

impl TestHarness {
    pub fn new(source: ScriptedSource, fields: &[&str]) -> Self {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();

        let mqtt_client = MockMqttClient::new();
        let topics = Topics::new("ink2mqtt/", "printer");
        let bridge = StatusBridge::new(
            source.clone(),
            HpInfoLayout::default(),
            mqtt_client.clone(),
            topics.clone(),
            fields.iter().map(|f| f.to_string()).collect(),
        );

        Self {
            bridge,
            source,
            mqtt_client,
            topics,
        }
    }

    pub fn state_messages(&self) -> Vec<MockMessage> {
        self.mqtt_client.find_messages_by_topic(&self.topics.state)
    }

    pub fn presence_messages(&self) -> Vec<MockMessage> {
        self.mqtt_client.find_messages_by_topic(&self.topics.presence)
    }

    /// Last state payload decoded as a JSON object
    pub fn last_state(&self) -> Option<serde_json::Value> {
        self.mqtt_client
            .get_last_json_message(&self.topics.state)
            .ok()
            .flatten()
    }
}

/// Collects formatted tracing output of the current thread
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes this thread's events here until the guard is dropped
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let buffer = self.buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || CaptureWriter(buffer.clone()))
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    /// Lines logged at `level` (e.g. "WARN") containing `needle`
    pub fn count(&self, level: &str, needle: &str) -> usize {
        self.output()
            .lines()
            .filter(|line| line.contains(level) && line.contains(needle))
            .count()
    }
}
