//! ink2mqtt - publish HP printer status to MQTT

use clap::Parser;
use ink2mqtt::config::{Cli, Settings};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Variables from .env (if present) feed the INK2MQTT_* flags
    dotenvy::dotenv().ok();

    let settings = match Settings::load(Cli::parse()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("ink2mqtt: {e:#}");
            std::process::exit(2);
        }
    };

    ink2mqtt::logging::init(&settings.log_level);
    info!("ink2mqtt {} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = ink2mqtt::app::run(settings).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
