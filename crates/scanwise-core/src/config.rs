//! Configuration management for ScanWise.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/scanwise/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// General application settings
    pub general: GeneralConfig,
    /// Remote analysis service settings
    pub service: ServiceConfig,
    /// Image capture settings
    pub capture: CaptureConfig,
    /// Initial values of the draft's user-context fields
    pub defaults: DraftDefaults,
}

impl AppConfig {
    /// Load configuration from an explicit path, falling back to defaults if
    /// the file does not exist.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        let config = Self::read_from(config_path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Reads `config_path`, or the default location when `None`. Values are
    /// validated once, after the overrides are applied.
    ///
    /// Supports the following environment variables:
    /// - `SCANWISE_SERVICE_URL`: Override the analysis service base URL
    /// - `SCANWISE_TIMEOUT_SECS`: Override the request timeout
    /// - `SCANWISE_OCR_LANGUAGE`: Override the OCR language hint
    pub fn load_with_env(config_path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match config_path {
            Some(path) => Self::read_from(path)?,
            None => Self::read_from(&Self::config_path()?)?,
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `SCANWISE_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SCANWISE_SERVICE_URL") {
            tracing::debug!("Override service.base_url from env: {}", url);
            self.service.base_url = url;
        }

        if let Ok(val) = std::env::var("SCANWISE_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.service.timeout_secs = secs;
                tracing::debug!("Override service.timeout_secs from env: {}", secs);
            }
        }

        if let Ok(lang) = std::env::var("SCANWISE_OCR_LANGUAGE") {
            tracing::debug!("Override capture.ocr_language from env: {}", lang);
            self.capture.ocr_language = lang;
        }
    }

    /// Check values that would otherwise fail much later.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.service.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "service.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.service.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "service.timeout_secs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.capture.max_image_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "capture.max_image_bytes".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        self.save_to(&Self::config_path()?)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, config_path: &Path) -> ConfigResult<()> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/scanwise/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "scanwise", "scanwise").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// UI theme: "light", "dark", or "system"
    pub theme: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
        }
    }
}

/// Remote analysis service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the analysis service
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 30,
            user_agent: format!("ScanWise/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Image capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Largest image accepted for text recognition, in bytes
    pub max_image_bytes: u64,
    /// Language hint passed to the recognition engine
    pub ocr_language: String,
    /// Path or name of the `tesseract` executable
    pub tesseract_path: String,
    /// Path or name of the `zbarimg` executable
    pub zbarimg_path: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 5 * 1024 * 1024, // 5 MB
            ocr_language: "eng".to_string(),
            tesseract_path: "tesseract".to_string(),
            zbarimg_path: "zbarimg".to_string(),
        }
    }
}

/// Initial values of the shared draft fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DraftDefaults {
    /// Default skin type
    pub skin_type: String,
    /// Default skin tone
    pub skin_tone: String,
    /// Default usage frequency
    pub usage_frequency: String,
    /// Default amount applied
    pub amount_applied: String,
}

impl Default for DraftDefaults {
    fn default() -> Self {
        Self {
            skin_type: "Normal".to_string(),
            skin_tone: "Medium".to_string(),
            usage_frequency: "Daily".to_string(),
            amount_applied: "Normal".to_string(),
        }
    }
}
