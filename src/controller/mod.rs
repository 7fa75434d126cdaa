//! Service control state machine.
//!
//! - [`ServiceController`]: query, stop, start and restart one service
//! - [`GatedController`]: the same, serialized per (host, service)

mod gate;
mod service;
mod transitions;
mod types;

pub use gate::{GateGuard, GatedController, ServiceGate};
pub use service::ServiceController;
pub use transitions::{restart_plan, start_transition, stop_transition, RestartPlan, Transition};
pub use types::{FailureKind, OperationKind, OperationOutcome, ServiceIdentity};
