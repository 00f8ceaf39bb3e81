//! # NETMATCH Common Library
//!
//! Shared code for the NETMATCH services:
//! - Submission record model and the form-response codec
//! - Match model produced by the external scoring unit
//! - Configuration loading and data folder resolution
//! - Utility functions

pub mod config;
pub mod error;
pub mod matches;
pub mod submission;
pub mod time;

pub use error::{Error, Result};
pub use matches::{Match, MatchSet};
pub use submission::{decode, QuestionResponse, ResponseEnvelope, Submission};
