//! Service status classification.
//!
//! Maps the free-text output of a status query onto [`ServiceStatus`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical service status reported by the remote service manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Unknown,
    Running,
    Stopped,
    StartPending,
    StopPending,
    ContinuePending,
    PausePending,
    Paused,
}

/// Status keywords in match priority order.
///
/// Pending tokens come before the settled ones they share a prefix with.
const STATUS_TOKENS: &[(&str, ServiceStatus)] = &[
    ("START_PENDING", ServiceStatus::StartPending),
    ("STOP_PENDING", ServiceStatus::StopPending),
    ("CONTINUE_PENDING", ServiceStatus::ContinuePending),
    ("PAUSE_PENDING", ServiceStatus::PausePending),
    ("RUNNING", ServiceStatus::Running),
    ("STOPPED", ServiceStatus::Stopped),
    ("PAUSED", ServiceStatus::Paused),
];

impl ServiceStatus {
    /// The keyword used by the remote service manager for this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
            Self::StartPending => "START_PENDING",
            Self::StopPending => "STOP_PENDING",
            Self::ContinuePending => "CONTINUE_PENDING",
            Self::PausePending => "PAUSE_PENDING",
            Self::Paused => "PAUSED",
        }
    }

    /// Statuses that are expected on the way to `self`.
    ///
    /// Anything outside this set observed while waiting for `self` means the
    /// service went somewhere else.
    pub fn transitional_toward(&self) -> &'static [ServiceStatus] {
        match self {
            Self::Stopped => &[Self::StopPending],
            Self::Running => &[Self::StartPending, Self::ContinuePending],
            Self::Paused => &[Self::PausePending],
            _ => &[],
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify raw status query output.
///
/// The `STATE` line is preferred when present; otherwise the whole output is
/// scanned. Never fails: output without a recognised keyword is
/// [`ServiceStatus::Unknown`].
pub fn parse_status(raw_output: &str) -> ServiceStatus {
    let upper = raw_output.to_uppercase();

    let state_line = upper
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("STATE"));

    if let Some(line) = state_line {
        if let Some(status) = match_token(line) {
            return status;
        }
    }

    match_token(&upper).unwrap_or(ServiceStatus::Unknown)
}

fn match_token(text: &str) -> Option<ServiceStatus> {
    STATUS_TOKENS
        .iter()
        .find(|(token, _)| text.contains(token))
        .map(|(_, status)| *status)
}
