//! Submission intake and lookup handlers
//!
//! POST /api/save-user-data, GET /api/submissions,
//! GET /api/submissions/search, GET /api/submissions/:user_id

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use netmatch_common::Submission;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// POST /api/save-user-data request
///
/// Both fields are optional at the type level so that their absence maps to
/// a `MISSING_FIELD` response instead of a body rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveUserDataRequest {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub form_data: Option<Value>,
}

/// POST /api/save-user-data response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveUserDataResponse {
    pub success: bool,
    pub message: String,
    pub user_id: String,
    /// Snapshot document name, relative to the data folder
    pub file_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error_kind: Option<String>,
}

/// GET /api/submissions/search query
#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// POST /api/save-user-data
///
/// Stores the submission, then runs `process_user`. A processing failure is
/// still a 200 with `processingError` set: the record is already durable.
/// A body that is not JSON of the expected shape is `INVALID_BODY` (400).
pub async fn save_user_data(
    State(state): State<AppState>,
    payload: Result<Json<SaveUserDataRequest>, JsonRejection>,
) -> ApiResult<Json<SaveUserDataResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))?;

    let outcome = state
        .orchestrator
        .ingest_and_process(request.user_id.as_deref(), request.form_data.as_ref())
        .await
        .map_err(|e| ApiError::from_orchestrator("Failed to save user data", e))?;

    let response = match outcome.processing {
        Ok(result) => SaveUserDataResponse {
            success: true,
            message: "User data saved and processed successfully".to_string(),
            user_id: outcome.user_id,
            file_path: outcome.file_path,
            processing_result: Some(result),
            processing_error: None,
            processing_error_kind: None,
        },
        Err(e) => SaveUserDataResponse {
            success: true,
            message: "User data saved successfully (processing failed)".to_string(),
            user_id: outcome.user_id,
            file_path: outcome.file_path,
            processing_result: None,
            processing_error: Some(e.to_string()),
            processing_error_kind: Some(e.kind().to_string()),
        },
    };

    Ok(Json(response))
}

/// GET /api/submissions
pub async fn list_submissions(State(state): State<AppState>) -> Json<Vec<Submission>> {
    Json(state.orchestrator.submissions().await)
}

/// GET /api/submissions/search?first_name=..&last_name=..
pub async fn find_submission_by_name(
    State(state): State<AppState>,
    Query(query): Query<NameQuery>,
) -> ApiResult<Json<Submission>> {
    let (Some(first), Some(last)) = (query.first_name, query.last_name) else {
        return Err(ApiError::MissingField("first_name and last_name".to_string()));
    };

    state
        .orchestrator
        .find_by_name(&first, &last)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_orchestrator("Failed to find submission", e))
}

/// GET /api/submissions/:user_id
pub async fn get_submission(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Submission>> {
    state
        .orchestrator
        .submission(&user_id)
        .await
        .map(Json)
        .map_err(|e| ApiError::from_orchestrator("Failed to get submission", e))
}

/// Build submission routes
pub fn submission_routes() -> Router<AppState> {
    Router::new()
        .route("/api/save-user-data", post(save_user_data))
        .route("/api/submissions", get(list_submissions))
        .route("/api/submissions/search", get(find_submission_by_name))
        .route("/api/submissions/:user_id", get(get_submission))
}
