//! Status to action tables of the three operations.
//!
//! Each table is evaluated once, against the status observed at entry.

use crate::status::ServiceStatus;

/// What a stop or start does for an observed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Issue the control command.
    Issue,
    /// Already in the target status; no remote action.
    AlreadyThere,
    /// Mid-transition; reject as a conflict.
    Conflict,
    /// Status incompatible with the operation.
    Invalid,
}

/// What a restart does for an observed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPlan {
    /// Stop, wait for STOPPED, then start.
    StopThenStart,
    /// Already stopped: start directly.
    StartOnly,
    Conflict,
    Invalid,
}

pub fn stop_transition(status: ServiceStatus) -> Transition {
    match status {
        ServiceStatus::Running | ServiceStatus::StartPending => Transition::Issue,
        ServiceStatus::Stopped => Transition::AlreadyThere,
        ServiceStatus::StopPending | ServiceStatus::PausePending => Transition::Conflict,
        ServiceStatus::Unknown | ServiceStatus::ContinuePending | ServiceStatus::Paused => {
            Transition::Invalid
        }
    }
}

pub fn start_transition(status: ServiceStatus) -> Transition {
    match status {
        ServiceStatus::Stopped | ServiceStatus::StopPending => Transition::Issue,
        ServiceStatus::Running => Transition::AlreadyThere,
        ServiceStatus::StartPending | ServiceStatus::PausePending => Transition::Conflict,
        ServiceStatus::Unknown | ServiceStatus::ContinuePending | ServiceStatus::Paused => {
            Transition::Invalid
        }
    }
}

pub fn restart_plan(status: ServiceStatus) -> RestartPlan {
    match status {
        ServiceStatus::Running => RestartPlan::StopThenStart,
        ServiceStatus::Stopped => RestartPlan::StartOnly,
        ServiceStatus::StartPending | ServiceStatus::StopPending => RestartPlan::Conflict,
        ServiceStatus::Unknown
        | ServiceStatus::ContinuePending
        | ServiceStatus::PausePending
        | ServiceStatus::Paused => RestartPlan::Invalid,
    }
}
