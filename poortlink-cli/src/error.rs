//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use poortlink::config::ConfigFileError;
use poortlink::zone::ZoneSourceError;
use poortlink::QueueError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Bad command-line argument
    InvalidArgument(String),
    /// Zone file could not be loaded
    Zones(ZoneSourceError),
    /// Queue operation failed
    Queue(QueueError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
}

impl CliError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Config(_) | CliError::InvalidArgument(_) => 2,
            _ => 1,
        }
    }

    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Zones(ZoneSourceError::Io { path, .. }) => {
                eprintln!();
                eprintln!("Create a zone file at {} or point [zones] file", path.display());
                eprintln!("in the config file at an existing one.");
            }
            CliError::Queue(QueueError::OutOfRange { .. }) => {
                eprintln!();
                eprintln!("Move closer to the zone center and try again.");
            }
            CliError::Config(_) => {
                eprintln!();
                eprintln!("Run 'poortlink init --force' to rewrite a default configuration.");
            }
            _ => {}
        }

        process::exit(self.exit_code())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Zones(e) => write!(f, "Failed to load zones: {}", e),
            CliError::Queue(e) => write!(f, "Queue operation failed: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Zones(e) => Some(e),
            CliError::Queue(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ZoneSourceError> for CliError {
    fn from(e: ZoneSourceError) -> Self {
        CliError::Zones(e)
    }
}

impl From<QueueError> for CliError {
    fn from(e: QueueError) -> Self {
        CliError::Queue(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::Config("bad".into()).exit_code(), 2);
        assert_eq!(CliError::InvalidArgument("bad".into()).exit_code(), 2);
        assert_eq!(CliError::LoggingInit("bad".into()).exit_code(), 1);
    }

    #[test]
    fn test_queue_error_message() {
        let err = CliError::from(QueueError::StoreUnavailable("timeout".into()));
        assert_eq!(
            err.to_string(),
            "Queue operation failed: Queue store unavailable: timeout"
        );
    }
}
