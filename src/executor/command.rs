//! Remote service control command lines.

use std::fmt;

/// The three command shapes issued against a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceCommand {
    /// Read-only status query.
    Query,
    /// Request the service to stop.
    Stop,
    /// Request the service to start.
    Start,
}

impl ServiceCommand {
    /// Verb understood by the service control program.
    pub fn verb(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Stop => "stop",
            Self::Start => "start",
        }
    }

    /// Render the full command line.
    ///
    /// The service name is double-quoted so names containing spaces reach
    /// the control program as a single argument. Names must have passed
    /// [`validate_service_name`](crate::validation::validate_service_name).
    pub fn render(&self, control_program: &str, service_name: &str) -> String {
        format!("{} {} \"{}\"", control_program, self.verb(), service_name)
    }
}

impl fmt::Display for ServiceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}
