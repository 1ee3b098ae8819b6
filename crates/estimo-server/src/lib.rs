//! Estimo Server - Price Estimate API
//!
//! JSON over HTTP around a single shared [`Estimator`]. The income table and
//! the model are loaded once at startup; handlers only read them.

pub mod error;
pub mod http;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use estimo_core::EstimoConfig;
use estimo_model::{Estimator, ModelError};

pub use error::ApiError;

/// Shared application state
#[derive(Debug)]
pub struct AppState {
    pub estimator: Estimator,
}

impl AppState {
    pub fn new(estimator: Estimator) -> Self {
        Self { estimator }
    }

    /// Load the income table and the model named in `config`.
    ///
    /// Fails if either artifact is missing or the model does not match the
    /// feature row layout, so a bad deployment never starts serving.
    pub fn from_config(config: &EstimoConfig) -> Result<Self, ModelError> {
        let estimator = Estimator::from_config(config)?;
        let model = estimator.model()?;
        tracing::info!(
            "Loaded {} postal codes and a {}-tree model from {:?}",
            estimator.income().len(),
            model.ensemble().num_trees(),
            model.source()
        );
        Ok(Self::new(estimator))
    }
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Reference data
        .route("/health", get(http::health))
        .route("/province/{postal_code}", get(http::get_province))
        .route("/postcodes", get(http::list_postcodes))
        .route("/subtypes", get(http::list_subtypes))
        .route("/conditions", get(http::list_conditions))
        // Estimation
        .route("/features", post(http::build_features))
        .route("/predict", post(http::predict))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the server
pub async fn serve(addr: &str, state: Arc<AppState>) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Estimo server listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
