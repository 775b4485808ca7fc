use crate::server::ServerState;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build all routes for the HTTP surface.
pub fn build_routes(state: ServerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/v3/api-docs", get(api_docs_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub profile: Option<String>,
    pub mongodb_uri_configured: bool,
}

async fn health_handler(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP".to_string(),
        version: state.version.clone(),
        profile: state.profile.clone(),
        mongodb_uri_configured: state.mongodb_uri_configured,
    })
}

// ============================================================================
// API docs
// ============================================================================

async fn api_docs_handler(State(state): State<ServerState>) -> Json<Value> {
    Json(state.api_document.as_ref().clone())
}
