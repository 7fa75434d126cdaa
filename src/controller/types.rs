//! Controller input and output types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::status::ServiceStatus;

/// Control operation requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Stop,
    Start,
    Restart,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Start => "start",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The service an operation targets, resolved before the controller runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    /// Server the service lives on.
    pub host_id: String,
    /// Name the remote service manager knows the service by.
    pub service_name: String,
    /// Human-readable name used in messages.
    pub display_name: String,
}

impl ServiceIdentity {
    pub fn new(host_id: &str, service_name: &str, display_name: &str) -> Self {
        Self {
            host_id: host_id.to_string(),
            service_name: service_name.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

/// Why an operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The request itself was unusable (e.g. an unsafe service name).
    InvalidRequest,
    /// The remote executor failed.
    Transport,
    /// The service manager rejected the command.
    CommandRejected,
    /// The service did not reach the intermediate status in time.
    ConvergenceTimeout,
    /// The service moved to a status outside the expected transition.
    UnexpectedState,
    /// Another operation on the same service held it past the deadline.
    Busy,
    /// The caller cancelled the operation.
    Cancelled,
}

/// Result of one controller invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OperationOutcome {
    /// The remote action was carried out.
    Succeeded {
        status: ServiceStatus,
        message: String,
    },
    /// Nothing to do: the service already is where it was asked to be.
    AlreadyInTargetState { message: String },
    /// The service is mid-transition; try again later.
    Conflict { message: String },
    /// The service's status does not allow the operation.
    InvalidState { message: String },
    /// The operation failed.
    Failed { kind: FailureKind, message: String },
}

impl OperationOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        match self {
            Self::Succeeded { message, .. }
            | Self::AlreadyInTargetState { message }
            | Self::Conflict { message }
            | Self::InvalidState { message }
            | Self::Failed { message, .. } => message,
        }
    }

    /// Whether the service ended where the caller wanted it.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::AlreadyInTargetState { .. }
        )
    }

    /// Short name of the outcome for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::AlreadyInTargetState { .. } => "already_in_target_state",
            Self::Conflict { .. } => "conflict",
            Self::InvalidState { .. } => "invalid_state",
            Self::Failed { .. } => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serialization() {
        let outcome = OperationOutcome::Succeeded {
            status: ServiceStatus::StopPending,
            message: "Print Spooler stopped".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "succeeded");
        assert_eq!(json["status"], "STOP_PENDING");

        let failed = OperationOutcome::failed(FailureKind::CommandRejected, "nope");
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["kind"], "command_rejected");
    }

    #[test]
    fn test_outcome_helpers() {
        let already = OperationOutcome::AlreadyInTargetState {
            message: "already stopped".to_string(),
        };
        assert!(already.is_success());
        assert_eq!(already.message(), "already stopped");
        assert_eq!(already.label(), "already_in_target_state");

        let conflict = OperationOutcome::Conflict {
            message: "busy".to_string(),
        };
        assert!(!conflict.is_success());
    }

    #[test]
    fn test_operation_kind_names() {
        assert_eq!(OperationKind::Restart.to_string(), "restart");
        assert_eq!(
            serde_json::from_str::<OperationKind>("\"stop\"").unwrap(),
            OperationKind::Stop
        );
    }
}
