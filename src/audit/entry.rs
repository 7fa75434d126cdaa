//! Audit entry types.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::controller::{OperationKind, OperationOutcome, ServiceIdentity};

/// A single audit log entry.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// RFC 3339 timestamp of when the request finished.
    pub timestamp: String,
    /// Unique identifier for the request.
    pub request_id: Uuid,
    pub operation: OperationKind,
    pub host_id: String,
    pub service: String,
    /// Outcome reported to the caller.
    pub result: OperationOutcome,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

impl AuditEntry {
    /// Create an entry stamped with the current time.
    pub fn new(
        request_id: Uuid,
        operation: OperationKind,
        identity: &ServiceIdentity,
        result: OperationOutcome,
        duration: Duration,
    ) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            request_id,
            operation,
            host_id: identity.host_id.clone(),
            service: identity.service_name.clone(),
            result,
            duration_ms: duration.as_millis() as u64,
        }
    }
}
