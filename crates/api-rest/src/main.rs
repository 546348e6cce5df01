//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful during development when only the REST server (with OpenAPI/Swagger UI) is needed.
//! The workspace's main `medux-run` binary serves the same router.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{config_from_env, serve, AppState};
use medux_core::AdminSite;

/// Main entry point for the MedUX REST API server
///
/// # Environment Variables
/// - `MEDUX_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `MEDUX_DATA_DIR`: Record storage directory (default: "medux_data")
/// - `MEDUX_NAMESPACE`: Host part of the local base URL (default: "medux.local")
/// - `MEDUX_API_KEY`: Key required on write requests; unset leaves writes open
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration is invalid or the data directory cannot be created,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("medux_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("MEDUX_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(config_from_env()?);
    if cfg.api_key().is_none() {
        tracing::warn!("MEDUX_API_KEY is not set; write requests are not authenticated");
    }
    let state = AppState::new(cfg.clone(), AdminSite::full())?;

    tracing::info!(
        "-- Starting MedUX REST API on {} (data: {})",
        addr,
        cfg.data_dir().display()
    );
    serve(&addr, state).await
}
