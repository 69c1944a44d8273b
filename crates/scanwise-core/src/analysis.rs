//! Analysis results and the payloads of the dependent service calls.
//!
//! Field names follow the analysis service's JSON. Optional sections default
//! to empty so that partially populated responses still decode.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Score at or above which a product counts as moderate risk.
///
/// Also the floor above which alternatives are looked up.
pub const MODERATE_RISK_THRESHOLD: f64 = 0.3;

/// Score at or above which a product counts as high risk.
pub const HIGH_RISK_THRESHOLD: f64 = 0.6;

/// Overall verdict assigned by the analysis service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusLabel {
    /// Score below the moderate threshold
    Safe,
    /// Score between the two thresholds
    Moderate,
    /// Score at or above the high threshold
    #[serde(alias = "TOXIC")]
    High,
}

/// How the product score was derived.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Average ingredient score before usage weighting
    #[serde(rename = "base_score", default)]
    pub base: f64,
    /// Multiplier for frequency and amount applied
    #[serde(default)]
    pub usage_factor: f64,
}

/// Per-ingredient line of the toxicity report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientReport {
    /// Ingredient name as cleaned by the service
    pub ingredient: String,
    /// Risk label (`SAFE`, `LOW RISK`, `MODERATE RISK`, ...)
    pub label: String,
    /// Ingredient score in [0, 1]
    pub score: f64,
}

/// Result of one successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Product name echoed by the service
    #[serde(default)]
    pub product_name: Option<String>,
    /// Product score in [0, 1]
    #[serde(rename = "product_toxicity_score")]
    pub toxicity_score: f64,
    /// Overall verdict
    #[serde(rename = "product_status")]
    pub status_label: StatusLabel,
    /// Score derivation
    #[serde(rename = "detailed_score_breakdown", default)]
    pub score_breakdown: ScoreBreakdown,
    /// Ingredients in label order
    #[serde(default)]
    pub ingredients: Vec<String>,
    /// Per-ingredient report in label order
    #[serde(rename = "toxicity_report", default)]
    pub per_ingredient_report: Vec<IngredientReport>,
    /// Ingredients unsuitable for the user's skin type
    #[serde(rename = "not_suitable_for_skin_type", default)]
    pub skin_type_warnings: BTreeSet<String>,
    /// Ingredients unsuitable for the user's skin tone
    #[serde(rename = "not_suitable_for_skin_tone", default)]
    pub skin_tone_warnings: BTreeSet<String>,
    /// Product category, if the service knows it
    #[serde(default)]
    pub category: Option<String>,
}

impl AnalysisResult {
    /// Whether the service analyzed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ingredients.is_empty() && self.per_ingredient_report.is_empty()
    }

    /// Product name, or the placeholder used for history and favorites.
    #[must_use]
    pub fn product_name_or_unknown(&self) -> &str {
        self.product_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("Unknown Product")
    }
}

/// Lower-scoring product suggested in place of the analyzed one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    /// Product name
    pub product_name: String,
    /// Brand, if known
    #[serde(default)]
    pub brand: Option<String>,
    /// Product score in [0, 1]
    pub toxicity_score: f64,
}

/// Product data resolved from a barcode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductData {
    /// Product name
    #[serde(default)]
    pub product_name: Option<String>,
    /// Raw ingredient list
    #[serde(default)]
    pub ingredients_text: Option<String>,
    /// Product category, if known
    #[serde(default)]
    pub category: Option<String>,
}

/// Catalog entry returned by a product search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Catalog identifier
    pub id: String,
    /// Product name
    pub product_name: String,
    /// Brand, if known
    #[serde(default)]
    pub brand: Option<String>,
}

/// Outcome of registering a favorite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteStatus {
    /// Newly added
    Added,
    /// Was already a favorite; informational, not an error
    AlreadyExists,
}

impl FavoriteStatus {
    /// Message shown next to the favorite button.
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Added => "Added to favorites!",
            Self::AlreadyExists => "Already in favorites",
        }
    }
}

/// One entry of the signed-in user's scan history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Product name
    #[serde(default)]
    pub product_name: Option<String>,
    /// Product score in [0, 1]
    pub toxicity_score: f64,
    /// When the scan was recorded. Unreadable values decode as `None`.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Parse an RFC 3339 timestamp, or a naive ISO 8601 one taken as UTC.
#[must_use]
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Other(serde::de::IgnoredAny),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(text)) => {
            let parsed = parse_timestamp(&text);
            if parsed.is_none() {
                tracing::debug!("Ignoring unreadable history timestamp '{}'", text);
            }
            parsed
        }
        Some(Raw::Other(_)) | None => None,
    })
}

/// Stored user preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Preferred skin type
    #[serde(default)]
    pub skin_type: Option<String>,
    /// Preferred skin tone
    #[serde(default)]
    pub skin_tone: Option<String>,
    /// UI theme preference
    #[serde(default)]
    pub theme_preference: Option<String>,
}
