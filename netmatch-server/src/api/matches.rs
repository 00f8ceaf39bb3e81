//! Scoring unit passthrough handlers
//!
//! POST /api/generate-matches, GET /api/get-matches/:user_id,
//! GET /api/get-all-matches, GET /api/get-sample-data, GET /api/matches

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use netmatch_common::Match;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// Result document wrapper shared by the passthrough routes
#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub result: Value,
}

impl ResultResponse {
    fn new(result: Value) -> Self {
        Self {
            success: true,
            message: None,
            result,
        }
    }
}

/// GET /api/matches response
#[derive(Debug, Serialize)]
pub struct FlatMatchesResponse {
    pub success: bool,
    pub total: usize,
    pub matches: Vec<Match>,
}

/// POST /api/generate-matches
pub async fn generate_matches(State(state): State<AppState>) -> ApiResult<Json<ResultResponse>> {
    let result = state
        .orchestrator
        .generate_matches()
        .await
        .map_err(|e| ApiError::from_orchestrator("Failed to generate matches", e))?;

    Ok(Json(ResultResponse {
        message: Some("Matches generated successfully".to_string()),
        ..ResultResponse::new(result)
    }))
}

/// GET /api/get-matches/:user_id
pub async fn get_user_matches(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<ResultResponse>> {
    info!(user_id = %user_id, "Getting matches for user");
    state
        .orchestrator
        .get_user_matches(&user_id)
        .await
        .map(|result| Json(ResultResponse::new(result)))
        .map_err(|e| ApiError::from_orchestrator("Failed to get user matches", e))
}

/// GET /api/get-all-matches
pub async fn get_all_matches(State(state): State<AppState>) -> ApiResult<Json<ResultResponse>> {
    state
        .orchestrator
        .get_all_matches()
        .await
        .map(|result| Json(ResultResponse::new(result)))
        .map_err(|e| ApiError::from_orchestrator("Failed to get all matches", e))
}

/// GET /api/get-sample-data
pub async fn get_sample_data(State(state): State<AppState>) -> ApiResult<Json<ResultResponse>> {
    state
        .orchestrator
        .get_sample_data()
        .await
        .map(|result| Json(ResultResponse::new(result)))
        .map_err(|e| ApiError::from_orchestrator("Failed to get sample data", e))
}

/// GET /api/matches
///
/// Match Set flattened into one list for the results page.
pub async fn flattened_matches(State(state): State<AppState>) -> ApiResult<Json<FlatMatchesResponse>> {
    let matches = state
        .orchestrator
        .flattened_matches()
        .await
        .map_err(|e| ApiError::from_orchestrator("Failed to get all matches", e))?;

    Ok(Json(FlatMatchesResponse {
        success: true,
        total: matches.len(),
        matches,
    }))
}

/// Build scoring unit routes
pub fn match_routes() -> Router<AppState> {
    Router::new()
        .route("/api/generate-matches", post(generate_matches))
        .route("/api/get-matches/:user_id", get(get_user_matches))
        .route("/api/get-all-matches", get(get_all_matches))
        .route("/api/get-sample-data", get(get_sample_data))
        .route("/api/matches", get(flattened_matches))
}
