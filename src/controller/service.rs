//! Service controller.
//!
//! Drives stop, start and restart against one remote service:
//! 1. Query the current status
//! 2. Pick the action from the transition tables
//! 3. Issue the control command(s), classifying their output
//! 4. Record the resulting status label (best effort)

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backoff::{wait_for, BackoffSchedule};
use crate::config::{BackoffConfig, ControlConfig, Settings};
use crate::context::OperationContext;
use crate::error::{ControlError, ControlResult, WaitError};
use crate::executor::{RemoteCommandExecutor, ServiceCommand};
use crate::status::{classify_command_output, parse_status, ErrorDetail, ServiceStatus};
use crate::storage::{StatusLabel, StatusSink};
use crate::validation::validate_service_name;

use super::transitions::{restart_plan, start_transition, stop_transition, RestartPlan, Transition};
use super::types::{FailureKind, OperationKind, OperationOutcome, ServiceIdentity};

/// Why a control command did not go through.
#[derive(Debug)]
enum ActionError {
    /// The executor failed or was interrupted.
    Transport(ControlError),
    /// The service manager answered with a failure marker.
    Rejected(ErrorDetail),
}

impl ActionError {
    fn into_outcome(self, verb: &str, identity: &ServiceIdentity) -> OperationOutcome {
        match self {
            Self::Transport(e) => OperationOutcome::failed(
                transport_failure_kind(&e),
                format!("failed to {} {}: {}", verb, identity.display_name, e),
            ),
            Self::Rejected(detail) => OperationOutcome::failed(
                FailureKind::CommandRejected,
                format!("failed to {} {}: {}", verb, identity.display_name, detail),
            ),
        }
    }
}

fn transport_failure_kind(error: &ControlError) -> FailureKind {
    if error.is_cancelled() {
        FailureKind::Cancelled
    } else {
        FailureKind::Transport
    }
}

/// Issues control commands and interprets their results.
#[derive(Debug, Clone)]
pub struct ServiceController {
    control_program: String,
    query_timeout: Duration,
    action_timeout: Duration,
    schedule: BackoffSchedule,
}

impl ServiceController {
    /// Create a controller from the `[control]` and `[backoff]` settings.
    pub fn new(control: &ControlConfig, backoff: &BackoffConfig) -> Self {
        Self {
            control_program: control.control_program.clone(),
            query_timeout: control.query_timeout(),
            action_timeout: control.action_timeout(),
            schedule: BackoffSchedule::from_config(backoff, control.wait_timeout()),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.control, &settings.backoff)
    }

    /// Replace the convergence wait schedule.
    pub fn with_schedule(mut self, schedule: BackoffSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Replace the query and action sub-deadlines.
    pub fn with_timeouts(mut self, query: Duration, action: Duration) -> Self {
        self.query_timeout = query;
        self.action_timeout = action;
        self
    }

    pub fn schedule(&self) -> &BackoffSchedule {
        &self.schedule
    }

    /// Run `kind` against `identity`.
    ///
    /// Every failure is folded into the returned outcome. Status label
    /// writes through `sink` never change the outcome.
    pub async fn execute(
        &self,
        ctx: &OperationContext,
        kind: OperationKind,
        identity: &ServiceIdentity,
        executor: &dyn RemoteCommandExecutor,
        sink: &dyn StatusSink,
    ) -> OperationOutcome {
        if let Err(e) = validate_service_name(&identity.service_name) {
            return OperationOutcome::failed(FailureKind::InvalidRequest, e.to_string());
        }

        let status = match self.query(ctx, identity, executor).await {
            Ok(status) => status,
            Err(e) => {
                return OperationOutcome::failed(
                    transport_failure_kind(&e),
                    format!("failed to query {}: {}", identity.display_name, e),
                );
            }
        };

        debug!(
            host_id = %identity.host_id,
            service = %identity.service_name,
            operation = %kind,
            status = %status,
            "Observed service status"
        );

        let outcome = match kind {
            OperationKind::Stop => self.stop(ctx, identity, executor, sink, status).await,
            OperationKind::Start => self.start(ctx, identity, executor, sink, status).await,
            OperationKind::Restart => self.restart(ctx, identity, executor, sink, status).await,
        };

        if outcome.is_success() {
            info!(
                host_id = %identity.host_id,
                service = %identity.service_name,
                operation = %kind,
                outcome = outcome.label(),
                "Service operation completed"
            );
        } else {
            warn!(
                host_id = %identity.host_id,
                service = %identity.service_name,
                operation = %kind,
                outcome = outcome.label(),
                message = %outcome.message(),
                "Service operation did not complete"
            );
        }

        outcome
    }

    /// Query the current status of a service.
    ///
    /// Output the parser does not recognise yields [`ServiceStatus::Unknown`].
    pub async fn query(
        &self,
        ctx: &OperationContext,
        identity: &ServiceIdentity,
        executor: &dyn RemoteCommandExecutor,
    ) -> ControlResult<ServiceStatus> {
        let output = self
            .run_command(ctx, self.query_timeout, executor, ServiceCommand::Query, identity)
            .await?;
        Ok(parse_status(&output))
    }

    async fn stop(
        &self,
        ctx: &OperationContext,
        identity: &ServiceIdentity,
        executor: &dyn RemoteCommandExecutor,
        sink: &dyn StatusSink,
        status: ServiceStatus,
    ) -> OperationOutcome {
        match stop_transition(status) {
            Transition::Issue => {
                let reported = match self.issue(ctx, executor, ServiceCommand::Stop, identity).await {
                    Ok(reported) => reported,
                    Err(e) => return e.into_outcome("stop", identity),
                };
                self.record(ctx, sink, identity, StatusLabel::Stopped).await;
                OperationOutcome::Succeeded {
                    status: settled(reported, ServiceStatus::Stopped),
                    message: format!("{} stopped", identity.display_name),
                }
            }
            Transition::AlreadyThere => {
                self.record(ctx, sink, identity, StatusLabel::Stopped).await;
                OperationOutcome::AlreadyInTargetState {
                    message: format!("{} is already stopped", identity.display_name),
                }
            }
            Transition::Conflict => OperationOutcome::Conflict {
                message: format!(
                    "{} is already stopping ({}); try again once the transition completes",
                    identity.display_name, status
                ),
            },
            Transition::Invalid => OperationOutcome::InvalidState {
                message: format!("cannot stop {} from state {}", identity.display_name, status),
            },
        }
    }

    async fn start(
        &self,
        ctx: &OperationContext,
        identity: &ServiceIdentity,
        executor: &dyn RemoteCommandExecutor,
        sink: &dyn StatusSink,
        status: ServiceStatus,
    ) -> OperationOutcome {
        match start_transition(status) {
            Transition::Issue => {
                let reported = match self.issue(ctx, executor, ServiceCommand::Start, identity).await {
                    Ok(reported) => reported,
                    Err(e) => return e.into_outcome("start", identity),
                };
                self.record(ctx, sink, identity, StatusLabel::Running).await;
                OperationOutcome::Succeeded {
                    status: settled(reported, ServiceStatus::Running),
                    message: format!("{} started", identity.display_name),
                }
            }
            Transition::AlreadyThere => {
                self.record(ctx, sink, identity, StatusLabel::Running).await;
                OperationOutcome::AlreadyInTargetState {
                    message: format!("{} is already running", identity.display_name),
                }
            }
            Transition::Conflict => OperationOutcome::Conflict {
                message: format!(
                    "{} is already starting ({}); try again once the transition completes",
                    identity.display_name, status
                ),
            },
            Transition::Invalid => OperationOutcome::InvalidState {
                message: format!("cannot start {} from state {}", identity.display_name, status),
            },
        }
    }

    async fn restart(
        &self,
        ctx: &OperationContext,
        identity: &ServiceIdentity,
        executor: &dyn RemoteCommandExecutor,
        sink: &dyn StatusSink,
        status: ServiceStatus,
    ) -> OperationOutcome {
        match restart_plan(status) {
            RestartPlan::StopThenStart => {
                if let Err(e) = self.issue(ctx, executor, ServiceCommand::Stop, identity).await {
                    return e.into_outcome("stop", identity);
                }

                let poll = move || self.query(ctx, identity, executor);
                match wait_for(ctx, poll, ServiceStatus::Stopped, &self.schedule).await {
                    Ok(polls) => {
                        debug!(
                            host_id = %identity.host_id,
                            service = %identity.service_name,
                            polls,
                            "Service reached STOPPED"
                        );
                    }
                    Err(e) => return wait_failure(e, identity),
                }
                self.record(ctx, sink, identity, StatusLabel::Stopped).await;

                self.restart_start(ctx, identity, executor, sink).await
            }
            RestartPlan::StartOnly => self.restart_start(ctx, identity, executor, sink).await,
            RestartPlan::Conflict => OperationOutcome::Conflict {
                message: format!(
                    "{} is already changing state ({}); try again once the transition completes",
                    identity.display_name, status
                ),
            },
            RestartPlan::Invalid => OperationOutcome::InvalidState {
                message: format!("cannot restart {} from state {}", identity.display_name, status),
            },
        }
    }

    async fn restart_start(
        &self,
        ctx: &OperationContext,
        identity: &ServiceIdentity,
        executor: &dyn RemoteCommandExecutor,
        sink: &dyn StatusSink,
    ) -> OperationOutcome {
        let reported = match self.issue(ctx, executor, ServiceCommand::Start, identity).await {
            Ok(reported) => reported,
            Err(e) => return e.into_outcome("start", identity),
        };
        self.record(ctx, sink, identity, StatusLabel::Running).await;
        OperationOutcome::Succeeded {
            status: settled(reported, ServiceStatus::Running),
            message: format!("{} restarted", identity.display_name),
        }
    }

    /// Issue a control command and classify its output. Returns the status
    /// the service manager reported in its answer.
    async fn issue(
        &self,
        ctx: &OperationContext,
        executor: &dyn RemoteCommandExecutor,
        command: ServiceCommand,
        identity: &ServiceIdentity,
    ) -> Result<ServiceStatus, ActionError> {
        let output = self
            .run_command(ctx, self.action_timeout, executor, command, identity)
            .await
            .map_err(ActionError::Transport)?;

        if let Some(detail) = classify_command_output(&output) {
            return Err(ActionError::Rejected(detail));
        }

        Ok(parse_status(&output))
    }

    async fn run_command(
        &self,
        ctx: &OperationContext,
        budget: Duration,
        executor: &dyn RemoteCommandExecutor,
        command: ServiceCommand,
        identity: &ServiceIdentity,
    ) -> ControlResult<String> {
        let ctx = ctx.with_timeout(budget);
        let line = command.render(&self.control_program, &identity.service_name);

        debug!(
            host_id = %identity.host_id,
            command = %line,
            budget_ms = budget.as_millis() as u64,
            "Running control command"
        );

        ctx.run(executor.run_command(&ctx, &line))
            .await
            .map_err(|reason| reason.into_transport_error(budget))?
    }

    /// Write a status label. Failures are logged and otherwise ignored.
    async fn record(
        &self,
        ctx: &OperationContext,
        sink: &dyn StatusSink,
        identity: &ServiceIdentity,
        label: StatusLabel,
    ) {
        let ctx = ctx.with_timeout(self.action_timeout);
        let result = match ctx
            .run(sink.change_service_status(&ctx, &identity.host_id, &identity.service_name, label))
            .await
        {
            Ok(result) => result,
            Err(reason) => Err(reason.into_transport_error(self.action_timeout)),
        };

        if let Err(e) = result {
            warn!(
                host_id = %identity.host_id,
                service = %identity.service_name,
                label = %label,
                error = %e,
                "Failed to record service status"
            );
        }
    }
}

impl Default for ServiceController {
    fn default() -> Self {
        Self::new(&ControlConfig::default(), &BackoffConfig::default())
    }
}

/// Status to report after a successful command: what the service manager
/// answered, or the target when its answer carried no status.
fn settled(reported: ServiceStatus, target: ServiceStatus) -> ServiceStatus {
    match reported {
        ServiceStatus::Unknown => target,
        other => other,
    }
}

fn wait_failure(error: WaitError, identity: &ServiceIdentity) -> OperationOutcome {
    let kind = match &error {
        WaitError::Timeout { .. } => FailureKind::ConvergenceTimeout,
        WaitError::UnexpectedState { .. } => FailureKind::UnexpectedState,
        WaitError::Cancelled { .. } => FailureKind::Cancelled,
        WaitError::PollFailed { source } => transport_failure_kind(source),
    };
    OperationOutcome::failed(
        kind,
        format!("failed to stop {}: {}", identity.display_name, error),
    )
}
