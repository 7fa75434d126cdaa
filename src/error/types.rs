//! Error types for the service control orchestrator.

use thiserror::Error;

use crate::status::ServiceStatus;

/// Main error type for the orchestrator and its collaborators.
#[derive(Error, Debug)]
pub enum ControlError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The remote executor itself failed.
    #[error("Transport error: {kind}")]
    Transport { kind: TransportErrorKind },

    /// Validation errors.
    #[error("Validation error: {kind}")]
    Validation { kind: ValidationErrorKind },

    /// Server or service lookup errors.
    #[error("Inventory error: {kind}")]
    Inventory { kind: InventoryErrorKind },

    /// Status storage errors.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// Audit log errors.
    #[error("Audit error: {message}")]
    Audit { message: String },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ControlError {
    /// Shorthand for a transport error of the given kind.
    pub fn transport(kind: TransportErrorKind) -> Self {
        Self::Transport { kind }
    }

    /// Whether this error was caused by cancellation of the operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                kind: TransportErrorKind::Cancelled
            }
        )
    }
}

/// Transport error kinds.
#[derive(Error, Debug)]
pub enum TransportErrorKind {
    #[error("Host {address}:{port} is not reachable")]
    Unreachable { address: String, port: u16 },

    #[error("Remote command failed: {message}")]
    ExecutionFailed { message: String },

    #[error("Remote command timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Operation cancelled")]
    Cancelled,
}

/// Validation error kinds.
#[derive(Error, Debug)]
pub enum ValidationErrorKind {
    #[error("Invalid service name '{name}': {message}")]
    InvalidServiceName { name: String, message: String },
}

/// Inventory lookup error kinds.
#[derive(Error, Debug)]
pub enum InventoryErrorKind {
    #[error("Unknown server: {host_id}")]
    UnknownServer { host_id: String },

    #[error("Unknown service '{service}' on server {host_id}")]
    UnknownService { host_id: String, service: String },
}

/// Errors produced while waiting for a service to converge.
#[derive(Error, Debug)]
pub enum WaitError {
    /// The deadline elapsed before the target was observed.
    #[error("Timed out waiting for {target} after {polls} polls (last observed: {})", observed_label(.last_observed))]
    Timeout {
        target: ServiceStatus,
        last_observed: Option<ServiceStatus>,
        polls: u32,
    },

    /// A status outside the expected transitional set was observed.
    #[error("Unexpected state {observed} while waiting for {target}")]
    UnexpectedState {
        target: ServiceStatus,
        observed: ServiceStatus,
    },

    /// The operation was cancelled while waiting.
    #[error("Cancelled while waiting for {target} after {polls} polls")]
    Cancelled { target: ServiceStatus, polls: u32 },

    /// The status poll itself failed.
    #[error("Status poll failed: {source}")]
    PollFailed {
        #[source]
        source: ControlError,
    },
}

fn observed_label(status: &Option<ServiceStatus>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "nothing".to_string())
}

/// Result type alias for orchestrator operations.
pub type ControlResult<T> = Result<T, ControlError>;
