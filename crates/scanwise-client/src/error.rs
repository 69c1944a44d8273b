//! Error types for the analysis client.

use scanwise_auth::AuthError;
use thiserror::Error;

/// Message shown for transport failures.
pub const CONNECTION_MESSAGE: &str = "Failed to connect to the server. Please try again.";

/// Errors returned by [`AnalysisService`](crate::AnalysisService) calls.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Domain error reported by the service, shown to the user verbatim
    #[error("{0}")]
    Remote(String),

    /// Transport failure: connect, timeout, or body read
    #[error("connection failed: {0}")]
    Connection(String),

    /// The requested product does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// The call needs a signed-in user
    #[error("not authenticated")]
    NotAuthenticated,

    /// Response body did not match the expected shape
    #[error("failed to parse response from {endpoint}: {message}")]
    Parse {
        /// Endpoint path
        endpoint: String,
        /// Decoder message
        message: String,
    },

    /// Client-side failure unrelated to the service
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// Message suitable for display in place of a result.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Remote(message) | Self::NotFound(message) => message.clone(),
            Self::Connection(_) => CONNECTION_MESSAGE.to_string(),
            Self::NotAuthenticated => "Please sign in to continue.".to_string(),
            Self::Parse { .. } | Self::Internal(_) => {
                "Something went wrong. Please try again.".to_string()
            }
        }
    }

    /// Whether the failure happened below the HTTP layer.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::Connection(err.to_string())
    }
}

impl From<AuthError> for ClientError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotAuthenticated => Self::NotAuthenticated,
            AuthError::TokenUnavailable(reason) => {
                Self::Internal(format!("token unavailable: {reason}"))
            }
        }
    }
}

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
