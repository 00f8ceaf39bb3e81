//! Shared test helpers: in-process scoring unit and app setup

#![allow(dead_code)]

use async_trait::async_trait;
use netmatch_server::services::{
    Action, ComputationInvoker, InvocationParams, InvokeError, MatchingOrchestrator,
    SubmissionStore,
};
use netmatch_server::{build_router, AppState};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// How the fake scoring unit answers
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Echo the action and params back as JSON
    Echo,
    Respond(Value),
    Fail(&'static str),
    Unavailable,
    Timeout,
}

/// In-process stand-in for the external scoring unit
pub struct FakeInvoker {
    default: Behavior,
    per_action: Mutex<HashMap<Action, Behavior>>,
    calls: Mutex<Vec<(Action, InvocationParams)>>,
}

impl FakeInvoker {
    pub fn new(default: Behavior) -> Self {
        Self {
            default,
            per_action: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self::new(Behavior::Echo)
    }

    pub fn failing() -> Self {
        Self::new(Behavior::Fail("scorer crashed"))
    }

    pub fn with(self, action: Action, behavior: Behavior) -> Self {
        self.per_action.lock().unwrap().insert(action, behavior);
        self
    }

    pub fn calls(&self) -> Vec<(Action, InvocationParams)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ComputationInvoker for FakeInvoker {
    async fn invoke(&self, action: Action, params: InvocationParams) -> Result<Value, InvokeError> {
        self.calls.lock().unwrap().push((action, params.clone()));
        let behavior = self
            .per_action
            .lock()
            .unwrap()
            .get(&action)
            .cloned()
            .unwrap_or_else(|| self.default.clone());

        match behavior {
            Behavior::Echo => Ok(json!({
                "success": true,
                "action": action.as_str(),
                "params": params,
            })),
            Behavior::Respond(value) => Ok(value),
            Behavior::Fail(stderr) => Err(InvokeError::Failed {
                status: "exit status: 1".to_string(),
                code: Some(1),
                signal: None,
                stderr: stderr.to_string(),
            }),
            Behavior::Unavailable => Err(InvokeError::Unavailable(
                "No such file or directory (os error 2)".to_string(),
            )),
            Behavior::Timeout => Err(InvokeError::Timeout(Duration::from_secs(120))),
        }
    }
}

/// Orchestrator over a fresh store in a temp folder
pub async fn orchestrator(invoker: Arc<FakeInvoker>) -> (MatchingOrchestrator, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = SubmissionStore::open_in(temp_dir.path()).await.unwrap();
    let orchestrator = MatchingOrchestrator::new(Arc::new(store), invoker);
    (orchestrator, temp_dir)
}

/// Router over a fresh store in a temp folder
pub async fn app(invoker: Arc<FakeInvoker>) -> (axum::Router, MatchingOrchestrator, TempDir) {
    let (orchestrator, temp_dir) = orchestrator(invoker).await;
    let router = build_router(AppState::new(orchestrator.clone()));
    (router, orchestrator, temp_dir)
}

/// Form data shaped like the attendee form's submission
pub fn form_data(user_id: &str, first: &str, last: &str) -> Value {
    json!({
        "userId": user_id,
        "timestamp": "2025-06-10T08:00:00.000Z",
        "responses": [
            {"question": "First Name", "answer": first},
            {"question": "Last Name", "answer": last},
            {"question": "LinkedIn Profile", "answer": "https://x"},
            {"question": "What do you bring?", "answer": "math"},
            {"question": "What are you looking for at this event?", "answer": "collabs"},
            {"question": "Help break the ice! What kind of stuff is your spice?", "answer": "chess"}
        ]
    })
}
