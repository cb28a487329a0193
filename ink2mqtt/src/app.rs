//! Startup sequence: validate fields, connect, then poll forever.
//!
//! Errors returned from here are fatal; the binary logs them and exits.

use rumqttc::AsyncClient;
use tracing::info;

use crate::bridge::StatusBridge;
use crate::broker;
use crate::config::Settings;
use crate::error::Result;
use crate::parser::HpInfoLayout;
use crate::source::{CommandSource, StatusSource};
use crate::validator;

pub type LiveBridge<S> = StatusBridge<S, HpInfoLayout, AsyncClient>;

/// Runs the validation and connection stages and hands back a bridge ready to poll.
///
/// The status source is queried exactly once here; a broker failure means
/// nothing has been published.
pub async fn start<S: StatusSource>(settings: &Settings, source: S) -> Result<LiveBridge<S>> {
    let parser = HpInfoLayout::default();

    let checked = validator::validate(&source, &parser, &settings.fields).await?;
    if checked.is_complete() {
        info!("All {} parameters present in status output", checked.found.len());
    } else {
        info!(
            "{} of {} parameters present in status output",
            checked.found.len(),
            settings.fields.len()
        );
    }

    let client = broker::connect(&settings.broker, &settings.topics).await?;

    Ok(StatusBridge::new(
        source,
        parser,
        client,
        settings.topics.clone(),
        settings.fields.clone(),
    ))
}

pub async fn run(settings: Settings) -> Result<()> {
    let source = CommandSource::new(&settings.command, settings.command_timeout)?;
    info!("Status command: {}", source.command_line());
    let mut bridge = start(&settings, source).await?;
    bridge.run(settings.interval).await;
    Ok(())
}
