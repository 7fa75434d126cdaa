//! Service name validation.
//!
//! Service names are placed inside double quotes on the remote command line,
//! so anything that could break out of the quoting is rejected.

use crate::error::{ControlError, ValidationErrorKind};

/// Longest service name the remote service manager accepts.
const MAX_SERVICE_NAME_LENGTH: usize = 256;

/// Characters that are never valid in a service name.
const FORBIDDEN_CHARS: &[char] = &['"', '/', '\\'];

/// Validate that a service name can be safely quoted into a command.
///
/// # Example
///
/// ```
/// use lumo_svcctl::validation::validate_service_name;
///
/// assert!(validate_service_name("Print Spooler").is_ok());
/// assert!(validate_service_name("evil\" & shutdown /s").is_err());
/// ```
pub fn validate_service_name(name: &str) -> Result<(), ControlError> {
    let invalid = |message: &str| ControlError::Validation {
        kind: ValidationErrorKind::InvalidServiceName {
            name: name.to_string(),
            message: message.to_string(),
        },
    };

    if name.trim().is_empty() {
        return Err(invalid("Service name cannot be empty"));
    }

    if name.chars().count() > MAX_SERVICE_NAME_LENGTH {
        return Err(invalid("Service name is too long"));
    }

    if name.contains(FORBIDDEN_CHARS) {
        return Err(invalid("Service name contains a quote or path separator"));
    }

    if name.chars().any(char::is_control) {
        return Err(invalid("Service name contains control characters"));
    }

    Ok(())
}
