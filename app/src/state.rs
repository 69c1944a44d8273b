//! Application state: configuration, sign-in and the scan session.

use anyhow::Context;
use scanwise_auth::{AuthSession, StaticTokenProvider, UserIdentity};
use scanwise_capture::{CaptureAdapter, TesseractRecognizer, ZbarDecoder};
use scanwise_client::HttpAnalysisClient;
use scanwise_core::AppConfig;
use scanwise_scanner::ScanSession;
use std::path::Path;
use std::sync::Arc;

/// Environment variable holding the bearer token of the signed-in user.
pub const TOKEN_ENV: &str = "SCANWISE_TOKEN";

/// Everything a command needs.
pub struct AppState {
    pub config: AppConfig,
    pub auth: AuthSession,
    pub session: ScanSession,
}

impl AppState {
    /// Load configuration, sign in when a user and token are available, and
    /// wire the session to the HTTP client and local capture engines.
    pub fn new(config_path: Option<&Path>, uid: Option<&str>) -> anyhow::Result<Self> {
        let config =
            AppConfig::load_with_env(config_path).context("failed to load configuration")?;

        let auth = AuthSession::new();
        match (uid, std::env::var(TOKEN_ENV).ok()) {
            (Some(uid), Some(token)) if !token.trim().is_empty() => {
                auth.sign_in(
                    UserIdentity::new(uid),
                    Arc::new(StaticTokenProvider::new(token)),
                );
            }
            (Some(uid), _) => {
                tracing::warn!("{} is not set, continuing signed out as guest ({})", TOKEN_ENV, uid);
            }
            (None, _) => tracing::debug!("No user given, continuing signed out"),
        }

        let client = HttpAnalysisClient::new(&config.service, auth.clone())
            .context("failed to build HTTP client")?;
        let capture = CaptureAdapter::new(
            Arc::new(TesseractRecognizer::new(config.capture.tesseract_path.clone())),
            Arc::new(ZbarDecoder::new(config.capture.zbarimg_path.clone())),
            &config.capture,
        );
        let session = ScanSession::new(Arc::new(client), capture, auth.clone(), &config.defaults);

        tracing::info!("Analysis service: {}", config.service.base_url);

        Ok(Self {
            config,
            auth,
            session,
        })
    }
}
