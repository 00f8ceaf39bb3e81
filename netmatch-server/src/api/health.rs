//! Health check endpoint

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always "OK" while the server answers
    pub status: String,
    pub message: String,
    /// Module name ("netmatch-server")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
}

/// GET /api/health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "Backend server is running".to_string(),
        module: "netmatch-server".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: netmatch_common::time::seconds_since(state.startup_time),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/api/health", get(health_check))
}
