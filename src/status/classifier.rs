//! Command outcome classification.
//!
//! A control command can complete at the transport level while the service
//! manager rejects the request in its text output. This module detects that
//! embedded failure marker and extracts the reason.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Reason extracted from a failed control command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDetail {
    /// Service manager operation that failed (e.g. "StartService").
    pub operation: Option<String>,
    /// Numeric error code reported next to the marker.
    pub code: Option<u32>,
    /// Human-readable reason text.
    pub reason: String,
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(op) = &self.operation {
            write!(f, "{} ", op)?;
        }
        f.write_str("failed")?;
        if let Some(code) = self.code {
            write!(f, " ({})", code)?;
        }
        write!(f, ": {}", self.reason)
    }
}

fn failure_marker() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(
            r"(?im)^[ \t]*\[sc\][ \t]*(?:(?P<op>[a-z][a-z0-9_:]*)[ \t]+)?failed\b(?:[ \t]+(?P<code>\d+))?[ \t]*:?",
        )
        .expect("failure marker pattern is valid")
    })
}

/// Inspect control command output for an embedded failure.
///
/// Only a line opening with the service manager's `[SC]` tag counts as a
/// marker; the word "failed" elsewhere (e.g. in an echoed service name) does
/// not. Returns `None` when the command reported no failure, and the extracted
/// [`ErrorDetail`] otherwise.
pub fn classify_command_output(output: &str) -> Option<ErrorDetail> {
    let captures = failure_marker().captures(output)?;
    let marker = captures.get(0)?;

    let operation = captures.name("op").map(|m| m.as_str().to_string());
    let code = captures
        .name("code")
        .and_then(|m| m.as_str().parse::<u32>().ok());

    let reason = output[marker.end()..]
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let reason = if reason.is_empty() {
        "command reported failure without a reason".to_string()
    } else {
        reason
    };

    Some(ErrorDetail {
        operation,
        code,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const START_PENDING_OUTPUT: &str = "\r\nSERVICE_NAME: Spooler \r\n        TYPE               : 110  WIN32_OWN_PROCESS  (interactive)\r\n        STATE              : 2  START_PENDING \r\n                                (NOT_STOPPABLE, NOT_PAUSABLE, IGNORES_SHUTDOWN)\r\n        WIN32_EXIT_CODE    : 0  (0x0)\r\n        PID                : 4242\r\n";

    #[test]
    fn test_success_output_has_no_failure() {
        assert_eq!(classify_command_output(START_PENDING_OUTPUT), None);
        assert_eq!(classify_command_output(""), None);
    }

    #[test]
    fn test_already_running() {
        let output = "[SC] StartService FAILED 1056:\r\n\r\nAn instance of the service is already running.\r\n";
        let detail = classify_command_output(output).unwrap();
        assert_eq!(detail.operation.as_deref(), Some("StartService"));
        assert_eq!(detail.code, Some(1056));
        assert_eq!(detail.reason, "An instance of the service is already running.");
    }

    #[test]
    fn test_not_started() {
        let output = "[SC] ControlService FAILED 1062:\n\nThe service has not been started.\n\n";
        let detail = classify_command_output(output).unwrap();
        assert_eq!(detail.code, Some(1062));
        assert_eq!(detail.reason, "The service has not been started.");
        assert_eq!(
            detail.to_string(),
            "ControlService failed (1062): The service has not been started."
        );
    }

    #[test]
    fn test_casing_and_whitespace_variations() {
        let output = "   [sc]   openservice   failed   1060 :   The specified service does not exist.  ";
        let detail = classify_command_output(output).unwrap();
        assert_eq!(detail.operation.as_deref(), Some("openservice"));
        assert_eq!(detail.code, Some(1060));
        assert_eq!(detail.reason, "The specified service does not exist.");
    }

    #[test]
    fn test_marker_without_code_or_reason() {
        let detail = classify_command_output("[SC] FAILED").unwrap();
        assert_eq!(detail.operation, None);
        assert_eq!(detail.code, None);
        assert!(detail.reason.contains("without a reason"));
    }

    #[test]
    fn test_marker_must_be_whole_word() {
        assert_eq!(classify_command_output("FAILEDOVER cluster group online"), None);
        assert_eq!(classify_command_output("[SC] StartService FAILEDOVER"), None);
    }

    #[test]
    fn test_failed_in_service_name_is_not_a_marker() {
        let output = "\r\nSERVICE_NAME: Failed Jobs \r\n        TYPE               : 10  WIN32_OWN_PROCESS\r\n        STATE              : 2  START_PENDING \r\n        WIN32_EXIT_CODE    : 0  (0x0)\r\n";
        assert_eq!(classify_command_output(output), None);
        assert_eq!(
            classify_command_output("DISPLAY_NAME: Retry failed 3 jobs\n"),
            None
        );
    }

    #[test]
    fn test_qualified_operation() {
        let detail =
            classify_command_output("[SC] EnumQueryServicesStatus:OpenService FAILED 1060:\n\nThe specified service does not exist as an installed service.\n")
                .unwrap();
        assert_eq!(
            detail.operation.as_deref(),
            Some("EnumQueryServicesStatus:OpenService")
        );
        assert_eq!(detail.code, Some(1060));
    }

    #[test]
    fn test_marker_after_echoed_name() {
        let output = "SERVICE_NAME: Failed Jobs\r\n[SC] ControlService FAILED 1062:\r\n\r\nThe service has not been started.\r\n";
        let detail = classify_command_output(output).unwrap();
        assert_eq!(detail.operation.as_deref(), Some("ControlService"));
        assert_eq!(detail.reason, "The service has not been started.");
    }
}
