//! # Error Types
//!
//! Custom error types for RC Drive using `thiserror`.

use thiserror::Error;

/// Main error type for RC Drive
#[derive(Debug, Error)]
pub enum RcDriveError {
    /// Configuration errors (parse failures and invalid values)
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Device capability reported as zero (cannot normalize)
    #[error("Device capability error: {0}")]
    Capability(String),

    /// Controller I/O errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No usable gamepad found
    #[error("No gamepad found (is the controller connected and readable?)")]
    ControllerNotFound,

    /// GPIO / PWM output errors
    #[error("Actuator error: {0}")]
    Actuator(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RcDriveError {
    /// Builds a configuration error from a validation message.
    pub(crate) fn invalid_config(msg: impl std::fmt::Display) -> Self {
        use serde::de::Error;
        RcDriveError::Config(toml::de::Error::custom(msg))
    }
}

/// Result type alias for RC Drive
pub type Result<T> = std::result::Result<T, RcDriveError>;
