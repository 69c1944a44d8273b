//! ScanWise Authentication Context
//!
//! Holds the signed-in user and the identity provider that issues bearer
//! tokens for the analysis service. The context is an explicit value handed to
//! the analysis client and the side-effect coordinator at construction time;
//! it is initialized on sign-in and torn down on sign-out.
//!
//! # Token Handling
//!
//! - Tokens are fetched from the identity provider on demand, once per call
//! - Tokens are opaque strings; their structure is never interpreted
//! - Tokens live in `Zeroizing` buffers and are never logged

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use zeroize::Zeroizing;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// No user is signed in
    #[error("not authenticated")]
    NotAuthenticated,

    /// The identity provider could not issue a token
    #[error("token unavailable: {0}")]
    TokenUnavailable(String),
}

/// Result type for authentication operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Identity of the signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Provider-assigned user id
    pub uid: String,
    /// Email address, if the provider shares it
    pub email: Option<String>,
}

impl UserIdentity {
    /// Create an identity with no email.
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
        }
    }
}

/// Source of bearer tokens for the signed-in user.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Issue a bearer token, refreshing it if the provider needs to.
    async fn bearer_token(&self) -> Result<Zeroizing<String>>;
}

/// Token provider that always returns the same token.
///
/// Used by the command-line shell, where the token is supplied up front.
pub struct StaticTokenProvider {
    token: Zeroizing<String>,
}

impl StaticTokenProvider {
    /// Wrap a pre-issued token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<Zeroizing<String>> {
        if self.token.is_empty() {
            return Err(AuthError::TokenUnavailable("empty token".to_string()));
        }
        Ok(self.token.clone())
    }
}

/// User id plus a freshly issued token, ready for one authenticated call.
pub struct Credentials {
    /// User id sent in request bodies
    pub uid: String,
    /// Bearer token (zeroized on drop)
    pub token: Zeroizing<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uid", &self.uid)
            .field("token", &"<redacted>")
            .finish()
    }
}

struct SignedIn {
    identity: UserIdentity,
    provider: Arc<dyn TokenProvider>,
}

/// Shared authentication context.
///
/// Cloning is cheap; every clone observes the same sign-in state.
#[derive(Clone, Default)]
pub struct AuthSession {
    inner: Arc<RwLock<Option<SignedIn>>>,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user())
            .finish()
    }
}

impl AuthSession {
    /// Create a signed-out context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sign a user in, replacing any previous user.
    pub fn sign_in(&self, identity: UserIdentity, provider: Arc<dyn TokenProvider>) {
        tracing::info!("User {} signed in", identity.uid);
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(SignedIn { identity, provider });
    }

    /// Sign the current user out and drop their token provider.
    pub fn sign_out(&self) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = guard.take() {
            tracing::info!("User {} signed out", previous.identity.uid);
        }
    }

    /// Check if a user is signed in
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.inner
            .read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<UserIdentity> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|signed_in| signed_in.identity.clone())
    }

    /// Fetch credentials for one authenticated call.
    pub async fn credentials(&self) -> Result<Credentials> {
        // Clone out of the lock so it is not held across the await.
        let (uid, provider) = {
            let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            let signed_in = guard.as_ref().ok_or(AuthError::NotAuthenticated)?;
            (signed_in.identity.uid.clone(), signed_in.provider.clone())
        };

        let token = provider.bearer_token().await?;
        Ok(Credentials { uid, token })
    }
}
