//! Log stream setup: timestamped human-readable lines at the configured level.

use tracing::warn;

use crate::config::LogLevel;

pub fn init(log_level: &LogLevel) {
    tracing_subscriber::fmt()
        .with_max_level(log_level.level)
        .with_target(false)
        .init();

    if let Some(rejected) = &log_level.rejected {
        warn!("Selected log level '{}' is not valid; using default", rejected);
    }
}
