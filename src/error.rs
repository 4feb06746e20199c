//! Error handling for the router status daemon.

use std::time::Duration;

/// A specialized `Result` type for router status operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

/// The main error type for the router status daemon.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Output of a file or helper utility could not be parsed
    #[error("Failed to parse system information: {0}")]
    Parse(String),

    /// A helper utility could not be spawned or exited unsuccessfully
    #[error("Command `{program}` failed: {reason}")]
    Command { program: String, reason: String },

    /// A helper utility did not finish in time
    #[error("Command `{program}` timed out after {after:?}")]
    Timeout { program: String, after: Duration },

    /// Display bus or panel failure
    #[error("Display error: {0}")]
    Display(String),

    /// Button input could not be set up
    #[error("Input error: {0}")]
    Input(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DaemonError {
    /// Create a new parse error
    pub fn parse_error(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a new command failure
    pub fn command_error(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Command {
            program: program.into(),
            reason: reason.into(),
        }
    }

    /// Create a new display error
    pub fn display_error(msg: impl Into<String>) -> Self {
        Self::Display(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error came from the display sink.
    pub fn is_display(&self) -> bool {
        matches!(self, Self::Display(_))
    }
}

#[cfg(feature = "hardware")]
impl From<rppal::i2c::Error> for DaemonError {
    fn from(err: rppal::i2c::Error) -> Self {
        Self::Display(err.to_string())
    }
}

#[cfg(feature = "hardware")]
impl From<rppal::gpio::Error> for DaemonError {
    fn from(err: rppal::gpio::Error) -> Self {
        Self::Input(err.to_string())
    }
}
