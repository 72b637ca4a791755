//! Stream watchdog binary

use watchdog_server::{Config, WatchdogServer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging settings live in the config, so load it before tracing is up
    let config = Config::load()?;

    common::logging::init_with_format(
        config.logging.format.as_deref(),
        config.logging.level.as_deref().unwrap_or("info"),
    );
    tracing::info!("Configuration loaded successfully");

    WatchdogServer::new(config).run().await
}
