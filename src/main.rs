use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{config_from_env, serve, AppState};
use medux_core::AdminSite;

/// Main entry point for the MedUX application
///
/// Loads `.env`, resolves the core configuration once and serves the REST admin API.
///
/// # Environment Variables
/// - `MEDUX_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `MEDUX_DATA_DIR`: Record storage directory (default: "medux_data")
/// - `MEDUX_NAMESPACE`: Host part of the local base URL (default: "medux.local")
/// - `MEDUX_API_KEY`: API key required on write requests
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("medux=info".parse()?)
                .add_directive("medux_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("MEDUX_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(config_from_env()?);
    if cfg.api_key().is_none() {
        tracing::warn!("MEDUX_API_KEY is not set; write requests are not authenticated");
    }
    let state = AppState::new(cfg.clone(), AdminSite::full())?;

    tracing::info!("++ Starting MedUX REST on {}", rest_addr);
    tracing::info!("++ Records stored under {}", cfg.data_dir().display());

    serve(&rest_addr, state).await
}
