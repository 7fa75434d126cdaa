//! Storage capability traits.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::OperationContext;
use crate::error::ControlResult;

use super::records::{ServerRecord, ServiceRecord};

/// Status label recorded for a service after a control operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusLabel {
    Running,
    Stopped,
}

impl StatusLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "Running",
            Self::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write-only view of the service status cache.
///
/// The orchestrator treats every write as best-effort: a failure is logged
/// and never changes the outcome of an operation whose remote action
/// already succeeded.
#[async_trait]
pub trait StatusSink: Send + Sync {
    /// Record `label` as the current status of `service_name` on `host_id`.
    async fn change_service_status(
        &self,
        ctx: &OperationContext,
        host_id: &str,
        service_name: &str,
        label: StatusLabel,
    ) -> ControlResult<()>;
}

/// Server and service records plus the status cache.
#[async_trait]
pub trait Storage: StatusSink {
    /// Look up a server by id.
    async fn get_server(&self, host_id: &str) -> ControlResult<ServerRecord>;

    /// Look up a service on a server.
    async fn get_service(&self, host_id: &str, service_name: &str) -> ControlResult<ServiceRecord>;
}
