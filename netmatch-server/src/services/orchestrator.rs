//! Matching orchestrator
//!
//! Composes the submission store and the computation invoker. Storage and
//! scoring are separate failure domains: once a submission is durably stored,
//! a scoring failure is reported alongside the success instead of failing
//! the intake.

use crate::services::invoker::{
    Action, ComputationInvoker, InvocationParams, InvokeError, PARAM_DATA, PARAM_USER_ID,
};
use crate::services::store::{StoreError, SubmissionStore};
use netmatch_common::{decode, Match, MatchSet, ResponseEnvelope, Submission};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Orchestrator errors
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The client omitted a required field
    #[error("Missing required fields: {0}")]
    MissingField(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Computation(#[from] InvokeError),
}

/// Result of ingesting one submission
#[derive(Debug)]
pub struct IngestOutcome {
    pub user_id: String,
    /// Snapshot document name the record was written to
    pub file_path: String,
    /// Record count after the upsert
    pub store_size: usize,
    /// Scoring unit outcome; an error here does not undo the stored record
    pub processing: Result<Value, InvokeError>,
}

/// Coordinates submission intake and scoring unit calls
#[derive(Clone)]
pub struct MatchingOrchestrator {
    store: Arc<SubmissionStore>,
    invoker: Arc<dyn ComputationInvoker>,
}

impl MatchingOrchestrator {
    pub fn new(store: Arc<SubmissionStore>, invoker: Arc<dyn ComputationInvoker>) -> Self {
        Self { store, invoker }
    }

    pub fn store(&self) -> &SubmissionStore {
        &self.store
    }

    /// Validate, decode, store, then hand the raw form data to the scoring unit
    ///
    /// `user_id` is the request's identity and overrides any `userId` inside
    /// the form data. A missing envelope timestamp is stamped with the
    /// current time.
    pub async fn ingest_and_process(
        &self,
        user_id: Option<&str>,
        form_data: Option<&Value>,
    ) -> Result<IngestOutcome, OrchestratorError> {
        let (user_id, form_data) = match (user_id.filter(|id| !id.is_empty()), form_data) {
            (Some(id), Some(data)) if !data.is_null() => (id, data),
            _ => {
                return Err(OrchestratorError::MissingField(
                    "userId and formData".to_string(),
                ))
            }
        };

        if !form_data.get("responses").is_some_and(Value::is_array) {
            return Err(OrchestratorError::MissingField("formData.responses".to_string()));
        }
        let mut envelope: ResponseEnvelope = serde_json::from_value(form_data.clone())
            .map_err(|e| OrchestratorError::MissingField(format!("formData.responses ({})", e)))?;

        if let Some(inner) = envelope.user_id.as_deref().filter(|inner| *inner != user_id) {
            warn!(
                user_id = %user_id,
                form_user_id = %inner,
                "formData.userId differs from request userId, using request userId"
            );
        }
        envelope.user_id = Some(user_id.to_string());
        if envelope.timestamp.as_deref().map_or(true, str::is_empty) {
            envelope.timestamp = Some(netmatch_common::time::now_rfc3339());
        }

        let submission = decode(&envelope);
        let store_size = self.store.upsert(submission).await?;
        info!(user_id = %user_id, store_size, "Submission saved");

        let mut params = InvocationParams::new();
        params.insert(PARAM_DATA.to_string(), form_data.to_string());
        let processing = self.invoker.invoke(Action::ProcessUser, params).await;
        if let Err(e) = &processing {
            warn!(
                user_id = %user_id,
                kind = e.kind(),
                error = %e,
                "Submission saved but processing failed"
            );
        }

        Ok(IngestOutcome {
            user_id: user_id.to_string(),
            file_path: self.store.file_name(),
            store_size,
            processing,
        })
    }

    /// Ask the scoring unit to regenerate matches for the whole population
    pub async fn generate_matches(&self) -> Result<Value, OrchestratorError> {
        info!("Generating matches for all users");
        Ok(self
            .invoker
            .invoke(Action::GenerateMatches, InvocationParams::new())
            .await?)
    }

    /// Matches for one user, as reported by the scoring unit
    ///
    /// `user_id` is not checked locally; the unit's own "not found" result
    /// passes through unchanged.
    pub async fn get_user_matches(&self, user_id: &str) -> Result<Value, OrchestratorError> {
        let mut params = InvocationParams::new();
        params.insert(PARAM_USER_ID.to_string(), user_id.to_string());
        Ok(self.invoker.invoke(Action::GetUserMatches, params).await?)
    }

    /// Full Match Set document
    pub async fn get_all_matches(&self) -> Result<Value, OrchestratorError> {
        Ok(self
            .invoker
            .invoke(Action::GetAllMatches, InvocationParams::new())
            .await?)
    }

    /// Sample population held by the scoring unit
    pub async fn get_sample_data(&self) -> Result<Value, OrchestratorError> {
        Ok(self
            .invoker
            .invoke(Action::GetSampleData, InvocationParams::new())
            .await?)
    }

    /// All matches across users as one ordered list, percentages filled
    pub async fn flattened_matches(&self) -> Result<Vec<Match>, OrchestratorError> {
        let document = self.get_all_matches().await?;
        Ok(MatchSet::from_document(&document).flatten())
    }

    pub async fn submissions(&self) -> Vec<Submission> {
        self.store.all().await
    }

    pub async fn submission(&self, user_id: &str) -> Result<Submission, OrchestratorError> {
        self.store
            .get(user_id)
            .await
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()).into())
    }

    pub async fn find_by_name(&self, first: &str, last: &str) -> Result<Submission, OrchestratorError> {
        Ok(self.store.find_by_name(first, last).await?)
    }
}
