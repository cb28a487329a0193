//! Configuration management
//!
//! Handles:
//! - Command-line flags (each one also readable from an `INK2MQTT_*` variable)
//! - Optional TOML file given with `--config`
//! - Defaults, precedence (flags/env > file > defaults) and validation

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use tracing::Level;

use crate::broker::{BrokerSettings, Topics};
use crate::error::BridgeError;
use crate::source::DEFAULT_COMMAND;

pub const DEFAULT_PORT: u16 = 1883;
pub const DEFAULT_CLIENT_ID: &str = "ink2mqtt";
pub const DEFAULT_BASE_TOPIC: &str = "ink2mqtt/";
pub const DEFAULT_TOPIC: &str = "printer";
pub const DEFAULT_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_PARAMETERS: &str = "desc,health-desc,level,status-desc";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "ink2mqtt", version, about = "Publish HP printer status to MQTT")]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "INK2MQTT_CONFIG")]
    pub config: Option<PathBuf>,

    /// MQTT broker host
    #[arg(long, env = "INK2MQTT_HOST")]
    pub host: Option<String>,

    /// MQTT broker port [default: 1883]
    #[arg(long, env = "INK2MQTT_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "INK2MQTT_USER")]
    pub user: Option<String>,

    #[arg(long, env = "INK2MQTT_PASSWD", hide_env_values = true)]
    pub passwd: Option<String>,

    /// MQTT client identifier [default: ink2mqtt]
    #[arg(long, env = "INK2MQTT_CLIENT")]
    pub client: Option<String>,

    /// Topic prefix, keep the trailing slash [default: ink2mqtt/]
    #[arg(long, env = "INK2MQTT_BASETOPIC")]
    pub basetopic: Option<String>,

    /// Topic under the prefix [default: printer]
    #[arg(long, env = "INK2MQTT_TOPIC")]
    pub topic: Option<String>,

    /// Seconds between polls [default: 10]
    #[arg(long, env = "INK2MQTT_INTERVAL")]
    pub interval: Option<u64>,

    /// Comma-separated fields to publish [default: desc,health-desc,level,status-desc]
    #[arg(long, env = "INK2MQTT_PARAMETERS")]
    pub parameters: Option<String>,

    /// DEBUG, INFO, WARNING or ERROR [default: info]
    #[arg(long, env = "INK2MQTT_LOGLEVEL")]
    pub loglevel: Option<String>,

    /// Status command line [default: sudo hp-info -i]
    #[arg(long, env = "INK2MQTT_COMMAND")]
    pub command: Option<String>,

    /// Kill the status command after this many seconds
    #[arg(long, env = "INK2MQTT_COMMAND_TIMEOUT")]
    pub command_timeout: Option<u64>,

    /// MQTT keep-alive in seconds [default: 60]
    #[arg(long, env = "INK2MQTT_KEEP_ALIVE")]
    pub keep_alive: Option<u64>,

    /// Seconds to wait for the broker to accept the connection [default: 30]
    #[arg(long, env = "INK2MQTT_CONNECT_TIMEOUT")]
    pub connect_timeout: Option<u64>,
}

/// Same keys as the flags, all optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub passwd: Option<String>,
    pub client: Option<String>,
    pub basetopic: Option<String>,
    pub topic: Option<String>,
    pub interval: Option<u64>,
    pub parameters: Option<String>,
    pub loglevel: Option<String>,
    pub command: Option<String>,
    pub command_timeout: Option<u64>,
    pub keep_alive: Option<u64>,
    pub connect_timeout: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

/// Resolved log level; `rejected` holds an unusable value that fell back to INFO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLevel {
    pub level: Level,
    pub rejected: Option<String>,
}

impl LogLevel {
    pub fn parse(raw: &str) -> Self {
        let level = match raw.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Level::DEBUG),
            "INFO" => Some(Level::INFO),
            "WARNING" | "WARN" => Some(Level::WARN),
            "ERROR" => Some(Level::ERROR),
            _ => None,
        };

        match level {
            Some(level) => Self { level, rejected: None },
            None => Self {
                level: Level::INFO,
                rejected: Some(raw.to_string()),
            },
        }
    }
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub topics: Topics,
    pub interval: Duration,
    pub fields: Vec<String>,
    pub log_level: LogLevel,
    pub command: String,
    pub command_timeout: Option<Duration>,
}

impl Settings {
    /// Reads the file named by `--config` (if any) and merges it under the flags.
    pub fn load(cli: Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Ok(Self::resolve(cli, file)?)
    }

    pub fn resolve(cli: Cli, file: FileConfig) -> Result<Self, BridgeError> {
        let host = cli
            .host
            .or(file.host)
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| BridgeError::Config("MQTT broker host is required (--host)".to_string()))?;

        let interval = cli.interval.or(file.interval).unwrap_or(DEFAULT_INTERVAL_SECS);
        if interval == 0 {
            return Err(BridgeError::Config("interval must be at least 1 second".to_string()));
        }

        let fields = parse_fields(
            cli.parameters
                .as_deref()
                .or(file.parameters.as_deref())
                .unwrap_or(DEFAULT_PARAMETERS),
        );
        if fields.is_empty() {
            return Err(BridgeError::Config("no parameters selected".to_string()));
        }

        let base_topic = cli.basetopic.or(file.basetopic).unwrap_or_else(|| DEFAULT_BASE_TOPIC.to_string());
        let topic = cli.topic.or(file.topic).unwrap_or_else(|| DEFAULT_TOPIC.to_string());

        let broker = BrokerSettings {
            host,
            port: cli.port.or(file.port).unwrap_or(DEFAULT_PORT),
            client_id: cli.client.or(file.client).unwrap_or_else(|| DEFAULT_CLIENT_ID.to_string()),
            username: cli.user.or(file.user),
            password: cli.passwd.or(file.passwd),
            keep_alive: Duration::from_secs(
                cli.keep_alive.or(file.keep_alive).unwrap_or(DEFAULT_KEEP_ALIVE_SECS),
            ),
            connect_timeout: Duration::from_secs(
                cli.connect_timeout
                    .or(file.connect_timeout)
                    .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            ),
        };

        Ok(Self {
            broker,
            topics: Topics::new(&base_topic, &topic),
            interval: Duration::from_secs(interval),
            fields,
            log_level: LogLevel::parse(
                cli.loglevel
                    .as_deref()
                    .or(file.loglevel.as_deref())
                    .unwrap_or(DEFAULT_LOG_LEVEL),
            ),
            command: cli.command.or(file.command).unwrap_or_else(|| DEFAULT_COMMAND.to_string()),
            command_timeout: cli
                .command_timeout
                .or(file.command_timeout)
                .map(Duration::from_secs),
        })
    }
}

/// Comma-separated list, order and duplicates kept, blanks dropped.
pub fn parse_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}
