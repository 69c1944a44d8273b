//! Display derivations over an [`AnalysisResult`].
//!
//! Everything here is pure: deriving a view any number of times has no
//! effect on the session or on the side effects of the result.

use scanwise_core::{AnalysisResult, StatusLabel, HIGH_RISK_THRESHOLD, MODERATE_RISK_THRESHOLD};
use serde::Serialize;

/// Title used when the service returned no product name.
pub const FALLBACK_TITLE: &str = "Analyzed Product";

/// Coarse risk category of a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBucket {
    /// Below 0.3
    Low,
    /// From 0.3 up to, not including, 0.6
    Moderate,
    /// 0.6 and above
    High,
}

impl ScoreBucket {
    /// `low`, `moderate` or `high`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
        }
    }
}

/// Bucket a score with the same cut points the service uses for its status label.
#[must_use]
pub fn score_bucket(score: f64) -> ScoreBucket {
    if score >= HIGH_RISK_THRESHOLD {
        ScoreBucket::High
    } else if score >= MODERATE_RISK_THRESHOLD {
        ScoreBucket::Moderate
    } else {
        ScoreBucket::Low
    }
}

/// Whether either suitability warning set is non-empty.
#[must_use]
pub fn has_warnings(result: &AnalysisResult) -> bool {
    !result.skin_type_warnings.is_empty() || !result.skin_tone_warnings.is_empty()
}

/// Risk class of one ingredient, from its report label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngredientRisk {
    /// `SAFE`
    Safe,
    /// `LOW RISK`
    Low,
    /// `MODERATE RISK`
    Moderate,
    /// Anything else
    High,
}

impl IngredientRisk {
    /// Classify a report label.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "SAFE" => Self::Safe,
            "LOW RISK" => Self::Low,
            "MODERATE RISK" => Self::Moderate,
            _ => Self::High,
        }
    }
}

/// One line of the ingredient table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientView {
    pub name: String,
    pub label: String,
    pub score: f64,
    pub risk: IngredientRisk,
}

/// Everything the result panel shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultView {
    pub title: String,
    pub score: f64,
    pub score_percent: u32,
    pub bucket: ScoreBucket,
    pub status_label: StatusLabel,
    pub base_score: f64,
    pub usage_factor: f64,
    pub ingredient_count: usize,
    pub ingredients: Vec<IngredientView>,
    pub skin_type_warnings: Vec<String>,
    pub skin_tone_warnings: Vec<String>,
    pub has_warnings: bool,
    pub category: Option<String>,
}

impl ResultView {
    /// Derive the view of `result`.
    #[must_use]
    pub fn from_result(result: &AnalysisResult) -> Self {
        let title = result
            .product_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(FALLBACK_TITLE)
            .to_string();

        let ingredients = result
            .per_ingredient_report
            .iter()
            .map(|line| IngredientView {
                name: line.ingredient.clone(),
                label: line.label.clone(),
                score: line.score,
                risk: IngredientRisk::from_label(&line.label),
            })
            .collect();

        Self {
            title,
            score: result.toxicity_score,
            score_percent: score_percent(result.toxicity_score),
            bucket: score_bucket(result.toxicity_score),
            status_label: result.status_label,
            base_score: result.score_breakdown.base,
            usage_factor: result.score_breakdown.usage_factor,
            ingredient_count: result.ingredients.len(),
            ingredients,
            skin_type_warnings: result.skin_type_warnings.iter().cloned().collect(),
            skin_tone_warnings: result.skin_tone_warnings.iter().cloned().collect(),
            has_warnings: has_warnings(result),
            category: result.category.clone(),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn score_percent(score: f64) -> u32 {
    if score.is_nan() {
        return 0;
    }
    (score.clamp(0.0, 1.0) * 100.0).round() as u32
}
