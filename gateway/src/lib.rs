pub mod api;
pub mod error;
pub mod handlers;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use blockmesh_core::Mesher;

// Application State
// Settings are immutable after startup; each request owns its own case dir.
#[derive(Clone)]
pub struct AppState {
    pub mesher: Arc<Mesher>,
}

impl AppState {
    pub fn new(mesher: Mesher) -> Self {
        Self {
            mesher: Arc::new(mesher),
        }
    }
}

/// Builds the gateway router. CORS is permissive because the mesh editor
/// front-end is served from a different origin.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health_check))
        .route("/blockmesh", post(handlers::run_block_mesh))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
