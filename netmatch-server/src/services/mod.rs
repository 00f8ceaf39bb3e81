//! Core services: submission store, scoring unit invoker, orchestrator

pub mod invoker;
pub mod orchestrator;
pub mod store;

pub use invoker::{Action, ComputationInvoker, InvocationParams, InvokeError, ProcessInvoker};
pub use orchestrator::{IngestOutcome, MatchingOrchestrator, OrchestratorError};
pub use store::{StoreError, SubmissionStore};
