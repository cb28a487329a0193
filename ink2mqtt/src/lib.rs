//! ink2mqtt - HP printer status bridge
//!
//! Polls `hp-info -i`, keeps the configured status fields and publishes them
//! as a retained JSON object on an MQTT topic, with an `online`/`offline`
//! presence topic backed by the broker's last will.

pub mod app;
pub mod bridge;
pub mod broker;
pub mod config;
pub mod error;
pub mod logging;
pub mod parser;
pub mod source;
pub mod validator;

pub use bridge::{PublishOutcome, StatusBridge, StatusSnapshot};
pub use broker::{MqttSink, Topics};
pub use config::Settings;
pub use error::BridgeError;
pub use parser::{HpInfoLayout, LineParser};
pub use source::{CommandSource, StatusSource};
