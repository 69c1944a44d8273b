//! Shared types used across the ScanWise application.
//!
//! This module defines the acquisition modes, the enumerated user-context
//! fields accepted by the analysis service, and validated newtypes for the
//! two mode-specific request payloads.

use crate::error::ScanwiseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The method currently used to obtain product data.
///
/// Exactly one mode is active per session. The mode decides which of the two
/// mode-specific draft fields (`ingredients_text`, `product_identifier`) may
/// hold a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// Pick a product from the catalog
    #[default]
    Search,
    /// Decode a product barcode from the camera
    BarcodeScan,
    /// Recognize a photographed ingredient label
    OpticalCapture,
    /// Type or paste the ingredient list
    Manual,
}

impl AcquisitionMode {
    /// Every mode, in presentation order.
    pub const ALL: [Self; 4] = [
        Self::Search,
        Self::BarcodeScan,
        Self::OpticalCapture,
        Self::Manual,
    ];

    /// Whether this mode's contract carries `ingredients_text`.
    #[must_use]
    pub fn accepts_ingredients(self) -> bool {
        matches!(self, Self::Manual | Self::OpticalCapture)
    }

    /// Whether this mode's contract carries `product_identifier`.
    #[must_use]
    pub fn accepts_identifier(self) -> bool {
        matches!(self, Self::Search | Self::BarcodeScan)
    }

    /// Whether this mode is driven by a capture engine.
    #[must_use]
    pub fn is_capture(self) -> bool {
        matches!(self, Self::BarcodeScan | Self::OpticalCapture)
    }

    /// Stable lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::BarcodeScan => "barcode_scan",
            Self::OpticalCapture => "optical_capture",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Skin type reported by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SkinType {
    /// Normal skin
    #[default]
    Normal,
    /// Oily skin
    Oily,
    /// Dry skin
    Dry,
    /// Combination skin
    Combination,
    /// Sensitive skin
    Sensitive,
}

impl SkinType {
    /// Every accepted value.
    pub const ALL: [Self; 5] = [
        Self::Normal,
        Self::Oily,
        Self::Dry,
        Self::Combination,
        Self::Sensitive,
    ];

    /// Wire value expected by the analysis service.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Oily => "Oily",
            Self::Dry => "Dry",
            Self::Combination => "Combination",
            Self::Sensitive => "Sensitive",
        }
    }
}

/// Skin tone reported by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SkinTone {
    /// Fair skin tone
    Fair,
    /// Medium skin tone
    #[default]
    Medium,
    /// Dark skin tone
    Dark,
}

impl SkinTone {
    /// Every accepted value.
    pub const ALL: [Self; 3] = [Self::Fair, Self::Medium, Self::Dark];

    /// Wire value expected by the analysis service.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fair => "Fair",
            Self::Medium => "Medium",
            Self::Dark => "Dark",
        }
    }
}

/// How often the product is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UsageFrequency {
    /// Every day
    #[default]
    Daily,
    /// About once a week
    Weekly,
    /// Now and then
    Occasional,
}

impl UsageFrequency {
    /// Every accepted value.
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Occasional];

    /// Wire value expected by the analysis service.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Occasional => "Occasional",
        }
    }
}

/// How much product is applied at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AmountApplied {
    /// Pea-sized amount
    Pea,
    /// Normal amount
    #[default]
    Normal,
    /// Generous amount
    Generous,
}

impl AmountApplied {
    /// Every accepted value.
    pub const ALL: [Self; 3] = [Self::Pea, Self::Normal, Self::Generous];

    /// Wire value expected by the analysis service.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pea => "Pea",
            Self::Normal => "Normal",
            Self::Generous => "Generous",
        }
    }
}

/// Match `value` case-insensitively against the wire names of `choices`.
fn parse_choice<T: Copy>(
    choices: &[T],
    name: fn(T) -> &'static str,
    value: &str,
    field: &str,
) -> Result<T, ScanwiseError> {
    let value = value.trim();
    choices
        .iter()
        .copied()
        .find(|choice| name(*choice).eq_ignore_ascii_case(value))
        .ok_or_else(|| {
            let accepted: Vec<&str> = choices.iter().map(|c| name(*c)).collect();
            ScanwiseError::Validation(format!(
                "invalid {field}: '{value}' is not one of {}",
                accepted.join(", ")
            ))
        })
}

impl FromStr for SkinType {
    type Err = ScanwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(&Self::ALL, Self::as_str, s, "skin_type")
    }
}

impl FromStr for SkinTone {
    type Err = ScanwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(&Self::ALL, Self::as_str, s, "skin_tone")
    }
}

impl FromStr for UsageFrequency {
    type Err = ScanwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(&Self::ALL, Self::as_str, s, "usage_frequency")
    }
}

impl FromStr for AmountApplied {
    type Err = ScanwiseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_choice(&Self::ALL, Self::as_str, s, "amount_applied")
    }
}

/// Newtype for catalog product identifiers (catalog id or barcode).
///
/// Identifiers are trimmed and must not be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProductId(String);

impl ProductId {
    /// Create a new `ProductId` from a string.
    ///
    /// # Errors
    /// Returns error if the identifier is empty after trimming.
    pub fn new(id: impl Into<String>) -> Result<Self, ScanwiseError> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(ScanwiseError::Validation(
                "product identifier must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProductId {
    type Error = ScanwiseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ProductId> for String {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Newtype for a non-empty, trimmed ingredient list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IngredientsText(String);

impl IngredientsText {
    /// Create a new `IngredientsText`.
    ///
    /// # Errors
    /// Returns error if the text is empty after trimming whitespace.
    pub fn new(text: impl Into<String>) -> Result<Self, ScanwiseError> {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ScanwiseError::Validation(
                "ingredients text must not be empty".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for IngredientsText {
    type Error = ScanwiseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IngredientsText> for String {
    fn from(text: IngredientsText) -> Self {
        text.0
    }
}

/// Identity of one submission attempt.
///
/// Every call to submit gets a fresh id; side effects and late responses are
/// matched against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionId(uuid::Uuid);

impl SubmissionId {
    /// Create a new random `SubmissionId`.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
