//! HTTP API handlers for netmatch-server
//!
//! Thin request/response adaptation over [`crate::services::MatchingOrchestrator`].

pub mod health;
pub mod matches;
pub mod submissions;

pub use health::health_routes;
pub use matches::match_routes;
pub use submissions::submission_routes;
