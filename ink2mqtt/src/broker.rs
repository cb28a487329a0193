//! MQTT side of the bridge
//!
//! Handles:
//! - Topic layout (`<base><topic>` for status, `<base><topic>/status` for presence)
//! - Connection with an `offline` last will, waiting for CONNACK
//! - Background event loop for the lifetime of the process
//! - Initial retained `online` presence message

use std::future::Future;
use std::time::Duration;

use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS};
use tracing::{debug, error, info};

use crate::error::{BridgeError, Result};

pub const PAYLOAD_ONLINE: &str = "online";
pub const PAYLOAD_OFFLINE: &str = "offline";

/// Every bridge publish is fire-and-forget.
pub const BRIDGE_QOS: QoS = QoS::AtMostOnce;

/// Topics derived from the configured base and leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub state: String,
    pub presence: String,
}

impl Topics {
    /// Plain concatenation: the base carries its own trailing `/`.
    pub fn new(base_topic: &str, topic: &str) -> Self {
        let state = format!("{base_topic}{topic}");
        let presence = format!("{state}/status");
        Self { state, presence }
    }
}

/// Where the bridge sends messages; implemented by the real client and by test doubles.
pub trait MqttSink {
    fn send(
        &self,
        topic: &str,
        qos: QoS,
        retain: bool,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// Never waits: with the broker gone the request queue fills up, and a full
/// queue is reported as a publish error instead of stalling the caller.
impl MqttSink for AsyncClient {
    async fn send(&self, topic: &str, qos: QoS, retain: bool, payload: Vec<u8>) -> Result<()> {
        AsyncClient::try_publish(self, topic, qos, retain, payload)
            .map_err(|e| BridgeError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })
    }
}

/// Broker connection parameters.
#[derive(Debug, Clone)]
pub struct BrokerSettings {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
}

impl BrokerSettings {
    fn mqtt_options(&self, topics: &Topics) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);

        if let Some(user) = &self.username {
            options.set_credentials(user, self.password.clone().unwrap_or_default());
        }

        options.set_last_will(LastWill::new(
            &topics.presence,
            PAYLOAD_OFFLINE,
            BRIDGE_QOS,
            true,
        ));
        options
    }
}

/// Connects, starts the background event loop and announces `online`.
///
/// Any failure here is fatal for the caller: nothing is retried.
pub async fn connect(settings: &BrokerSettings, topics: &Topics) -> Result<AsyncClient> {
    let (client, mut eventloop) = AsyncClient::new(settings.mqtt_options(topics), 10);

    tokio::time::timeout(settings.connect_timeout, wait_for_connack(&mut eventloop))
        .await
        .map_err(|_| {
            BridgeError::Connect(format!(
                "no answer from {}:{} within {:?}",
                settings.host, settings.port, settings.connect_timeout
            ))
        })??;

    tokio::spawn(drive_event_loop(eventloop));

    client.send(&topics.presence, BRIDGE_QOS, true, PAYLOAD_ONLINE.into()).await?;
    info!("Connected to MQTT broker.");

    Ok(client)
}

async fn wait_for_connack(eventloop: &mut EventLoop) -> Result<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Incoming::ConnAck(ack))) => {
                return match ack.code {
                    ConnectReturnCode::Success => Ok(()),
                    code => Err(BridgeError::Connect(format!("broker refused connection: {code:?}"))),
                };
            }
            Ok(_) => {}
            Err(e) => return Err(BridgeError::Connect(e.to_string())),
        }
    }
}

/// Keeps the connection serviced (keep-alives, outgoing queue) forever.
async fn drive_event_loop(mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(packet)) => debug!("MQTT incoming: {:?}", packet),
            Ok(_) => {}
            Err(e) => {
                error!("MQTT connection error: {}", e);
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(port: u16) -> BrokerSettings {
        BrokerSettings {
            host: "127.0.0.1".to_string(),
            port,
            client_id: "ink2mqtt-test".to_string(),
            username: Some("user".to_string()),
            password: None,
            keep_alive: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_topics_layout() {
        let topics = Topics::new("ink2mqtt/", "printer");
        assert_eq!(topics.state, "ink2mqtt/printer");
        assert_eq!(topics.presence, "ink2mqtt/printer/status");
    }

    #[test]
    fn test_last_will_is_retained_offline() {
        let topics = Topics::new("ink2mqtt/", "printer");
        let options = settings(1883).mqtt_options(&topics);

        let will = options.last_will().unwrap();
        assert!(will.topic == "ink2mqtt/printer/status");
        assert_eq!(&will.message[..], b"offline");
        assert_eq!(will.qos, QoS::AtMostOnce);
        assert!(will.retain);
        assert_eq!(options.keep_alive(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_full_queue_fails_fast() {
        let (client, _eventloop) = AsyncClient::new(MqttOptions::new("ink2mqtt-test", "127.0.0.1", 1), 10);

        let sends = async {
            let mut failures = 0;
            for _ in 0..20 {
                if let Err(e) = client.send("ink2mqtt/printer", BRIDGE_QOS, true, b"{}".to_vec()).await {
                    assert!(matches!(e, BridgeError::Publish { .. }));
                    failures += 1;
                }
            }
            failures
        };

        let failures = tokio::time::timeout(Duration::from_secs(3), sends)
            .await
            .expect("send blocked on a full request queue");
        assert_eq!(failures, 10);
    }

    #[tokio::test]
    async fn test_connect_refused_is_error() {
        // bind then drop to get a port nobody listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let topics = Topics::new("ink2mqtt/", "printer");
        let result = connect(&settings(port), &topics).await;
        assert!(matches!(result, Err(BridgeError::Connect(_))));
    }
}
