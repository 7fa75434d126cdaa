//! Bounded, cancellable exponential-backoff polling.
//!
//! Used after a control command to wait for the service to reach its
//! intended status.

mod schedule;
mod waiter;

pub use schedule::BackoffSchedule;
pub use waiter::wait_for;
