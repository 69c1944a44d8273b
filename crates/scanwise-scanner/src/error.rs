use scanwise_capture::CaptureError;
use scanwise_client::ClientError;
use scanwise_core::{AcquisitionMode, DraftField};
use thiserror::Error;

/// A draft that cannot become a canonical request.
///
/// Always names the first offending field in draft order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Missing { field: DraftField },

    #[error("{reason}")]
    Invalid { field: DraftField, reason: String },
}

impl ValidationError {
    /// The offending field.
    #[must_use]
    pub fn field(&self) -> DraftField {
        match self {
            Self::Missing { field } | Self::Invalid { field, .. } => *field,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{field} is not part of {mode} mode")]
    FieldOutsideMode {
        field: DraftField,
        mode: AcquisitionMode,
    },

    #[error("no capture can run in {0} mode")]
    CaptureNotActive(AcquisitionMode),

    #[error("submission superseded by a newer one")]
    Superseded,

    #[error("no analysis result to act on")]
    NoResult,

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("service error: {0}")]
    Client(#[from] ClientError),
}

impl ScanError {
    /// Message suitable for display next to the form or in place of results.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Capture(e) => e.user_message(),
            Self::Client(e) => e.user_message(),
            Self::NotAuthenticated => "Please sign in to continue.".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
