//! EnhancerScope web server
//!
//! Run with: cargo run -p enhancerscope-web
//! Configuration is read from `enhancerscope.toml` or `$ENHANCERSCOPE_CONFIG`.

use std::sync::Arc;

use anyhow::Context;
use enhancerscope_common::AppConfig;
use enhancerscope_data::{DatasetSource, FileDatasetSource};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("enhancerscope=debug,info")),
        )
        .init();

    info!("Starting EnhancerScope...");

    let config = AppConfig::load().context("loading configuration")?;
    config.validate().context("validating configuration")?;

    let source = FileDatasetSource::new(config.data.clone());
    info!("Loading dataset from {}", source.describe());
    let dataset = match source.load() {
        Ok(dataset) => dataset,
        Err(e) => {
            error!("Failed to load dataset: {}", e);
            return Err(e).context("loading dataset");
        }
    };
    info!(
        "Dataset ready: {} enhancers, {} records",
        dataset.enhancer_count(),
        dataset.records().len()
    );

    let state = enhancerscope_web::state::AppState::new(Arc::new(dataset), config.clone());
    state.integrity.log();

    let app = enhancerscope_web::router::build_router(state);

    let addr = config.server.socket_addr()?;
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
