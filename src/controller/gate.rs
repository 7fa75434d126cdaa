//! Per-service serialization of operations.
//!
//! Two operations on the same (host, service) pair never overlap; the second
//! one waits for the first to finish before it queries the service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OwnedMutexGuard;
use tracing::debug;

use crate::context::{Interrupted, OperationContext};
use crate::executor::RemoteCommandExecutor;
use crate::storage::StatusSink;

use super::service::ServiceController;
use super::types::{FailureKind, OperationKind, OperationOutcome, ServiceIdentity};

type ServiceKey = (String, String);

type LockMap = HashMap<ServiceKey, Arc<tokio::sync::Mutex<()>>>;

/// Keyed locks, one per (host, service) pair.
///
/// An entry lives only while some operation holds or waits for it.
#[derive(Debug, Default)]
pub struct ServiceGate {
    locks: Mutex<LockMap>,
}

/// Exclusive access to one service; released on drop.
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a ServiceGate,
    key: ServiceKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ServiceGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn locks(&self) -> MutexGuard<'_, LockMap> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Wait for exclusive access to a service.
    pub async fn acquire(&self, host_id: &str, service_name: &str) -> GateGuard<'_> {
        let key = (host_id.to_string(), service_name.to_string());
        let lock = self.locks().entry(key.clone()).or_default().clone();
        let mut pending = PendingLock {
            gate: self,
            key: Some(key),
        };
        let acquiring = lock.lock_owned();
        let guard = acquiring.await;
        GateGuard {
            gate: self,
            key: pending.key.take().unwrap_or_default(),
            guard: Some(guard),
        }
    }

    /// Number of services currently held or waited for.
    pub fn tracked(&self) -> usize {
        self.locks().len()
    }

    /// Drop the entry for `key` once no guard or waiter references it.
    fn release(&self, key: &ServiceKey) {
        let mut locks = self.locks();
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.gate.release(&self.key);
    }
}

/// Evicts the entry if an acquire is abandoned while waiting.
struct PendingLock<'a> {
    gate: &'a ServiceGate,
    key: Option<ServiceKey>,
}

impl Drop for PendingLock<'_> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.gate.release(&key);
        }
    }
}

/// A [`ServiceController`] whose operations are serialized per service.
#[derive(Debug, Default)]
pub struct GatedController {
    controller: ServiceController,
    gate: ServiceGate,
}

impl GatedController {
    pub fn new(controller: ServiceController) -> Self {
        Self {
            controller,
            gate: ServiceGate::new(),
        }
    }

    pub fn controller(&self) -> &ServiceController {
        &self.controller
    }

    /// Run `kind` once no other operation holds the service.
    ///
    /// Waiting for the gate counts against the context's deadline.
    pub async fn execute(
        &self,
        ctx: &OperationContext,
        kind: OperationKind,
        identity: &ServiceIdentity,
        executor: &dyn RemoteCommandExecutor,
        sink: &dyn StatusSink,
    ) -> OperationOutcome {
        let acquire = self.gate.acquire(&identity.host_id, &identity.service_name);
        let _guard = match ctx.run(acquire).await {
            Ok(guard) => guard,
            Err(reason) => {
                let kind = match reason {
                    Interrupted::Cancelled => FailureKind::Cancelled,
                    Interrupted::DeadlineExceeded => FailureKind::Busy,
                };
                return OperationOutcome::failed(
                    kind,
                    format!(
                        "gave up waiting for another operation on {}: {}",
                        identity.display_name, reason
                    ),
                );
            }
        };

        debug!(
            host_id = %identity.host_id,
            service = %identity.service_name,
            operation = %kind,
            "Acquired service gate"
        );

        self.controller.execute(ctx, kind, identity, executor, sink).await
    }
}
