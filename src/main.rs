//! # TurnoYa API
//!
//! Appointment booking server.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading
//! - Database connection pool and migrations
//! - Redis client (when configured)
//! - HTTP server

use anyhow::Result;
use tracing::info;

use turnoya_api::config::Settings;
use turnoya_api::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    turnoya_api::telemetry::init_tracing();

    info!("Starting TurnoYa API...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
