//! Configuration module for the service control orchestrator.
//!
//! Handles loading and validating configuration from TOML files.

mod settings;

pub use settings::*;
