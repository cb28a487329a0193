//! Error type shared by every stage of the bridge.
//!
//! Whether an error is fatal depends on where it surfaces (startup vs. the
//! polling loop), so the type itself carries no severity.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Command `{command}` could not be started: {source}")]
    SourceSpawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` failed ({status}): {stderr}")]
    SourceExit {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("Command `{command}` timed out after {timeout:?}")]
    SourceTimeout { command: String, timeout: Duration },

    #[error("Command output unavailable: {0}")]
    SourceOutput(String),

    #[error("Unable to connect to MQTT broker: {0}")]
    Connect(String),

    #[error("Message send failed on {topic}: {reason}")]
    Publish { topic: String, reason: String },

    #[error("JSON error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
