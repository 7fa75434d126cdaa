//! Convergence wait with exponential backoff.

use std::future::Future;

use tracing::debug;

use crate::context::{Interrupted, OperationContext};
use crate::error::{ControlResult, WaitError};
use crate::status::ServiceStatus;

use super::schedule::BackoffSchedule;

/// Poll until `target` is observed, the schedule's deadline elapses, or the
/// context is interrupted.
///
/// Each iteration sleeps for the current delay and then polls once. A
/// transitional status toward `target` grows the delay; any other status
/// ends the wait with [`WaitError::UnexpectedState`]. A failing poll aborts
/// the wait immediately. Returns the number of polls made.
pub async fn wait_for<F, Fut>(
    ctx: &OperationContext,
    mut poll: F,
    target: ServiceStatus,
    schedule: &BackoffSchedule,
) -> Result<u32, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ControlResult<ServiceStatus>>,
{
    let ctx = ctx.with_timeout(schedule.deadline);
    let expected = target.transitional_toward();

    let mut delay = schedule.initial_delay.min(schedule.max_delay);
    let mut polls: u32 = 0;
    let mut last_observed: Option<ServiceStatus> = None;

    let interrupted = |reason: Interrupted, polls: u32, last_observed: Option<ServiceStatus>| match reason {
        Interrupted::Cancelled => WaitError::Cancelled { target, polls },
        Interrupted::DeadlineExceeded => WaitError::Timeout {
            target,
            last_observed,
            polls,
        },
    };

    loop {
        if let Err(reason) = ctx.sleep(delay).await {
            return Err(interrupted(reason, polls, last_observed));
        }

        if let Err(reason) = ctx.check() {
            return Err(interrupted(reason, polls, last_observed));
        }

        polls += 1;
        let status = match ctx.run(poll()).await {
            Ok(Ok(status)) => status,
            Ok(Err(source)) => return Err(WaitError::PollFailed { source }),
            Err(reason) => return Err(interrupted(reason, polls, last_observed)),
        };
        last_observed = Some(status);

        debug!(
            target_status = %target,
            observed = %status,
            poll = polls,
            delay_ms = delay.as_millis() as u64,
            "Polled service status"
        );

        if status == target {
            return Ok(polls);
        }

        if !expected.contains(&status) {
            return Err(WaitError::UnexpectedState {
                target,
                observed: status,
            });
        }

        delay = schedule.next_delay(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::error::{ControlError, TransportErrorKind};

    /// Poll function replaying a fixed script and recording when it was called.
    fn scripted(
        script: Vec<ControlResult<ServiceStatus>>,
    ) -> (
        impl FnMut() -> std::future::Ready<ControlResult<ServiceStatus>>,
        Arc<Mutex<Vec<Instant>>>,
    ) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&calls);
        let mut script = script.into_iter();
        let poll = move || {
            recorded.lock().unwrap().push(Instant::now());
            std::future::ready(script.next().unwrap_or(Ok(ServiceStatus::StopPending)))
        };
        (poll, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn test_converges_on_third_poll() {
        let (poll, calls) = scripted(vec![
            Ok(ServiceStatus::StopPending),
            Ok(ServiceStatus::StopPending),
            Ok(ServiceStatus::Stopped),
        ]);
        let start = Instant::now();
        let ctx = OperationContext::new();

        let polls = wait_for(&ctx, poll, ServiceStatus::Stopped, &BackoffSchedule::default())
            .await
            .unwrap();

        assert_eq!(polls, 3);
        let offsets: Vec<u128> = calls
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.duration_since(start).as_millis())
            .collect();
        // Sleeps of 100ms, 200ms and 400ms precede the three polls.
        assert_eq!(offsets, vec![100, 300, 700]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fires_mid_sleep() {
        let (poll, calls) = scripted(vec![]);
        let schedule = BackoffSchedule {
            deadline: Duration::from_millis(250),
            ..BackoffSchedule::default()
        };
        let ctx = OperationContext::new();

        let err = wait_for(&ctx, poll, ServiceStatus::Stopped, &schedule)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WaitError::Timeout {
                target: ServiceStatus::Stopped,
                last_observed: Some(ServiceStatus::StopPending),
                polls: 1,
            }
        ));
        // Only the poll at 100ms ran; the one due at 300ms never did.
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_deadline_bounds_wait() {
        let (poll, calls) = scripted(vec![]);
        let ctx = OperationContext::new().with_timeout(Duration::from_millis(50));

        let err = wait_for(&ctx, poll, ServiceStatus::Stopped, &BackoffSchedule::default())
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Timeout { polls: 0, .. }));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unexpected_state_fails_fast() {
        let (poll, calls) = scripted(vec![
            Ok(ServiceStatus::StopPending),
            Ok(ServiceStatus::Running),
        ]);
        let ctx = OperationContext::new();

        let err = wait_for(&ctx, poll, ServiceStatus::Stopped, &BackoffSchedule::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            WaitError::UnexpectedState {
                target: ServiceStatus::Stopped,
                observed: ServiceStatus::Running,
            }
        ));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_aborts_wait() {
        let (poll, calls) = scripted(vec![
            Ok(ServiceStatus::StopPending),
            Err(ControlError::transport(TransportErrorKind::ExecutionFailed {
                message: "connection reset".to_string(),
            })),
        ]);
        let ctx = OperationContext::new();

        let err = wait_for(&ctx, poll, ServiceStatus::Stopped, &BackoffSchedule::default())
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::PollFailed { .. }));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_is_distinct_from_timeout() {
        let (poll, _calls) = scripted(vec![]);
        let ctx = OperationContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            canceller.cancel();
        });

        let err = wait_for(&ctx, poll, ServiceStatus::Stopped, &BackoffSchedule::default())
            .await
            .unwrap_err();

        assert!(matches!(err, WaitError::Cancelled { polls: 1, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_capped_while_waiting() {
        let mut script: Vec<ControlResult<ServiceStatus>> =
            (0..8).map(|_| Ok(ServiceStatus::StartPending)).collect();
        script.push(Ok(ServiceStatus::Running));
        let (poll, calls) = scripted(script);
        let schedule = BackoffSchedule {
            max_delay: Duration::from_millis(400),
            ..BackoffSchedule::default()
        };
        let start = Instant::now();
        let ctx = OperationContext::new();

        wait_for(&ctx, poll, ServiceStatus::Running, &schedule)
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        let gaps: Vec<u128> = calls
            .iter()
            .scan(start, |previous, t| {
                let gap = t.duration_since(*previous).as_millis();
                *previous = *t;
                Some(gap)
            })
            .collect();
        assert_eq!(gaps, vec![100, 200, 400, 400, 400, 400, 400, 400, 400]);
    }
}
