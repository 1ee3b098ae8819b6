//! Estimo Server Binary
//!
//! Configuration comes from `ESTIMO_CONFIG` (a TOML file path) or the
//! standard lookup locations; `ESTIMO_ADDR` overrides the listen address.

use std::path::PathBuf;
use std::sync::Arc;

use estimo_core::EstimoConfig;
use estimo_server::{serve, AppState};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var_os("ESTIMO_CONFIG").map(PathBuf::from);
    let config = EstimoConfig::discover(config_path.as_deref())?;

    let state = Arc::new(AppState::from_config(&config)?);
    let addr = std::env::var("ESTIMO_ADDR").unwrap_or_else(|_| config.server.addr.clone());

    serve(&addr, state).await
}
