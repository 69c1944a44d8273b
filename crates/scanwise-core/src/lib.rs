//! ScanWise Core - Foundation crate for the ScanWise product analyzer.
//!
//! This crate provides the domain types shared by every other ScanWise crate:
//! acquisition modes, the draft and canonical analysis requests, the analysis
//! result returned by the remote service, configuration and error types.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Acquisition modes and the enumerated user-context fields
//! - [`request`] - `DraftRequest` (mutable, per session) and `CanonicalRequest` (immutable)
//! - [`analysis`] - Analysis results, side-effect payloads and the risk thresholds
//!
//! # Example
//!
//! ```rust
//! use scanwise_core::{AcquisitionMode, AppConfig, DraftRequest};
//!
//! let config = AppConfig::default();
//! let mut draft = DraftRequest::from_defaults(&config.defaults);
//! draft.retain_for_mode(AcquisitionMode::Search);
//! assert!(draft.ingredients_text.is_none());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod request;
pub mod types;

// Re-export commonly used types
pub use analysis::{
    parse_timestamp, Alternative, AnalysisResult, CatalogProduct, FavoriteStatus, HistoryEntry,
    IngredientReport,
    ProductData, ScoreBreakdown, StatusLabel, UserProfile, HIGH_RISK_THRESHOLD,
    MODERATE_RISK_THRESHOLD,
};
pub use config::{AppConfig, CaptureConfig, DraftDefaults, GeneralConfig, ServiceConfig};
pub use error::{ConfigError, ConfigResult, Result, ScanwiseError};
pub use request::{CanonicalRequest, DraftField, DraftRequest, UsageContext};
pub use types::{
    AcquisitionMode, AmountApplied, IngredientsText, ProductId, SkinTone, SkinType,
    SubmissionId, UsageFrequency,
};
