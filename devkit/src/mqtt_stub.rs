/*!
Mock MQTT client pour développement sans broker

Enregistre tous les messages publiés et permet de simuler des échecs
d'envoi sur un topic donné.
*/

use ink2mqtt::error::{BridgeError, Result};
use ink2mqtt::MqttSink;
use parking_lot::Mutex;
use rumqttc::QoS;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct MockMessage {
    pub topic: String,
    pub payload: Vec<u8>,
    pub qos: QoS,
    pub retain: bool,
}

impl MockMessage {
    pub fn payload_str(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Mock MQTT client implementing the bridge's `MqttSink`
#[derive(Clone, Default)]
pub struct MockMqttClient {
    published_messages: Arc<Mutex<Vec<MockMessage>>>,
    failing_topics: Arc<Mutex<HashSet<String>>>,
}

impl MockMqttClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publish on `topic` fails until `recover` is called
    pub fn fail_on(&self, topic: &str) {
        self.failing_topics.lock().insert(topic.to_string());
    }

    pub fn recover(&self, topic: &str) {
        self.failing_topics.lock().remove(topic);
    }

    /// Tous les messages publiés (pour assertions de tests)
    pub fn get_published_messages(&self) -> Vec<MockMessage> {
        self.published_messages.lock().clone()
    }

    /// Messages publiés sur un topic donné
    pub fn find_messages_by_topic(&self, topic: &str) -> Vec<MockMessage> {
        self.published_messages
            .lock()
            .iter()
            .filter(|msg| msg.topic == topic)
            .cloned()
            .collect()
    }

    /// Parse le dernier message d'un topic en JSON
    pub fn get_last_json_message<T>(&self, topic: &str) -> anyhow::Result<Option<T>>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        match self.find_messages_by_topic(topic).last() {
            Some(last_msg) => Ok(Some(serde_json::from_slice(&last_msg.payload)?)),
            None => Ok(None),
        }
    }

    pub fn clear(&self) {
        self.published_messages.lock().clear();
    }
}

impl MqttSink for MockMqttClient {
    async fn send(&self, topic: &str, qos: QoS, retain: bool, payload: Vec<u8>) -> Result<()> {
        if self.failing_topics.lock().contains(topic) {
            return Err(BridgeError::Publish {
                topic: topic.to_string(),
                reason: "simulated failure".to_string(),
            });
        }

        tracing::debug!("[MOCK] Published to {}: {} bytes", topic, payload.len());
        self.published_messages.lock().push(MockMessage {
            topic: topic.to_string(),
            payload,
            qos,
            retain,
        });
        Ok(())
    }
}
