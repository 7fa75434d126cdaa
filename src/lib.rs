//! Lumo service control library.
//!
//! Stops, starts and restarts services on remote Windows hosts by issuing
//! service manager commands through a pluggable executor, waiting for status
//! convergence with exponential backoff, and recording the resulting status.

pub mod audit;
pub mod backoff;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod executor;
pub mod status;
pub mod storage;
pub mod validation;
