//! CLI error types and exit codes.

use citysight_core::error::{CitySightError, ConfigError, LayoutError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, I/O or output failures
    pub const GENERAL_ERROR: i32 = 1;
    /// The requested layout edit is not allowed
    pub const INVALID_EDIT: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected layout edit
    #[error("Layout error: {0}")]
    Layout(String),

    /// Simulation could not run
    #[error("Simulation error: {0}")]
    Simulation(String),

    /// Output serialization failed
    #[error("Output error: {0}")]
    Output(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::InvalidLayout(e) => Self::Layout(e.to_string()),
            other => Self::Config(other.to_string()),
        }
    }
}

impl From<LayoutError> for CliError {
    fn from(err: LayoutError) -> Self {
        Self::Layout(err.to_string())
    }
}

impl From<CitySightError> for CliError {
    fn from(err: CitySightError) -> Self {
        match err {
            CitySightError::Layout(e) => e.into(),
            CitySightError::Config(e) => e.into(),
            other => Self::Simulation(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Output(err.to_string())
    }
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, simulation, output, IO)
    /// - 2: Rejected layout edit
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Layout(_) => exit_codes::INVALID_EDIT,
            Self::Config(_) | Self::Simulation(_) | Self::Output(_) | Self::Io(_) => {
                exit_codes::GENERAL_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use citysight_core::models::DeviceId;

    #[test]
    fn layout_errors_use_edit_exit_code() {
        let err: CliError = LayoutError::DuplicateDevice(DeviceId::from("cam")).into();
        assert_eq!(err.exit_code(), exit_codes::INVALID_EDIT);
    }

    #[test]
    fn invalid_stored_layout_is_a_layout_error() {
        let err: CliError = ConfigError::InvalidLayout(LayoutError::DuplicateDevice(
            DeviceId::from("cam"),
        ))
        .into();
        assert!(matches!(err, CliError::Layout(_)));
    }

    #[test]
    fn io_errors_are_general() {
        let err: CliError = std::io::Error::other("disk").into();
        assert_eq!(err.exit_code(), exit_codes::GENERAL_ERROR);
    }
}
