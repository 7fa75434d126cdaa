//! Error types for the service control orchestrator.
//!
//! Provides a unified error handling system using thiserror.

mod types;

pub use types::*;
