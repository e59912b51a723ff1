//! Error handling for Playhead
//!
//! Transport operations themselves are total. Only construction and
//! configuration can fail, and those failures carry recovery suggestions.

use thiserror::Error;

/// Result type alias for Playhead operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Main error type for Playhead operations
#[derive(Error, Debug)]
pub enum TransportError {
    // Construction Errors
    #[error("No tokio runtime available to drive the interval ticker")]
    NoRuntime,

    #[error("Invalid frame rate: {rate} (must be finite, positive and give a representable tick interval)")]
    InvalidFrameRate { rate: f64 },

    #[error("Invalid frame interval: interval must be greater than zero")]
    InvalidInterval,

    // Configuration Errors
    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TransportError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            TransportError::NoRuntime => "NO_RUNTIME",
            TransportError::InvalidFrameRate { .. } => "INVALID_FRAME_RATE",
            TransportError::InvalidInterval => "INVALID_INTERVAL",
            TransportError::Config { .. } => "CONFIG_ERROR",
            TransportError::Io(_) => "IO_ERROR",
            TransportError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TransportError::NoRuntime
                | TransportError::InvalidFrameRate { .. }
                | TransportError::InvalidInterval
                | TransportError::Config { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TransportError::NoRuntime => vec![
                "Construct the controller from inside a tokio runtime",
                "Inject a ManualTicker when no runtime is available",
            ],
            TransportError::InvalidFrameRate { .. } => vec![
                "Use a positive frame rate such as 60.0",
                "Omit the frame rate to fall back to the 60 Hz default",
            ],
            TransportError::InvalidInterval => vec!["Use a non-zero tick interval"],
            TransportError::Config { .. } => vec![
                "Check the configuration values against their documented ranges",
                "Delete the configuration file to fall back to defaults",
            ],
            _ => vec![],
        }
    }
}
