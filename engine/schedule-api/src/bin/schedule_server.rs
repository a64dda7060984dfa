//! Schedule API server

use anyhow::{Context, Result};
use schedule_api::create_routes;
use schedule_loader::logging::initialize_logging;
use schedule_loader::{LoaderConfig, PostgresScheduleStore, ScheduleStore};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    initialize_logging("info", &std::env::var("LOG_FORMAT").unwrap_or_default())?;

    info!("Starting schedule API server...");

    let config = LoaderConfig::from_env().context("Failed to load database config")?;
    let store: Arc<dyn ScheduleStore> = Arc::new(PostgresScheduleStore::new(config.connect_options()));

    let port = match std::env::var("SCHEDULE_API_PORT") {
        Ok(port) => port.parse::<u16>().context("Invalid SCHEDULE_API_PORT")?,
        Err(_) => 8081,
    };

    let routes = create_routes(store);

    info!("Starting schedule API server on port {}", port);
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;

    Ok(())
}
