//! netmatch-server library - Submission intake and match orchestration
//!
//! Records attendee submissions in a durable snapshot and forwards scoring
//! work to the external scoring unit.

pub mod api;
pub mod config;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::MatchingOrchestrator;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: MatchingOrchestrator,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: MatchingOrchestrator) -> Self {
        Self {
            orchestrator,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// CORS is permissive: the form UI is served from a different origin.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::submission_routes())
        .merge(api::match_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
