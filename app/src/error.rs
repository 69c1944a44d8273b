//! Error types for CLI commands.

use scanwise_client::ClientError;
use scanwise_scanner::ScanError;
use serde::Serialize;

/// Serializable error printed when a command fails.
#[derive(Debug, Serialize)]
pub struct CommandError {
    /// Error code for scripted handling (e.g., "VALIDATION_FAILED")
    pub code: String,
    /// User-friendly error message
    pub message: String,
    /// Optional context (never contains credentials)
    pub details: Option<serde_json::Value>,
}

impl CommandError {
    /// Create a new command error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Create a command error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

impl From<ScanError> for CommandError {
    fn from(err: ScanError) -> Self {
        let message = err.user_message();
        match err {
            ScanError::Validation(e) => Self::with_details(
                "VALIDATION_FAILED",
                message,
                serde_json::json!({ "field": e.field() }),
            ),
            ScanError::FieldOutsideMode { field, mode } => Self::with_details(
                "FIELD_OUTSIDE_MODE",
                message,
                serde_json::json!({ "field": field, "mode": mode }),
            ),
            ScanError::CaptureNotActive(_) => Self::new("CAPTURE_NOT_ACTIVE", message),
            ScanError::Superseded => Self::new("SUPERSEDED", message),
            ScanError::NoResult => Self::new("NO_RESULT", message),
            ScanError::NotAuthenticated => Self::new("NOT_AUTHENTICATED", message),
            ScanError::Capture(_) => Self::new("CAPTURE_FAILED", message),
            ScanError::Client(e) => match e {
                ClientError::Connection(_) => Self::new("CONNECTION_FAILED", message),
                ClientError::NotFound(_) => Self::new("NOT_FOUND", message),
                ClientError::NotAuthenticated => Self::new("NOT_AUTHENTICATED", message),
                _ => Self::new("SERVICE_ERROR", message),
            },
        }
    }
}

impl From<anyhow::Error> for CommandError {
    fn from(err: anyhow::Error) -> Self {
        Self::new("INTERNAL_ERROR", format!("{err:#}"))
    }
}
