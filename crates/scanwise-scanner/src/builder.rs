//! Draft to canonical request conversion.
//!
//! Per-mode field contract:
//!
//! | Mode                     | `product_identifier` | `ingredients_text` |
//! |--------------------------|----------------------|--------------------|
//! | Search, `BarcodeScan`    | required             | always absent      |
//! | Manual, `OpticalCapture` | always absent        | required           |
//!
//! The four shared fields are required in every mode and must hold one of
//! their enumerated values. `product_name` and `category` are optional.

use crate::error::ValidationError;
use scanwise_core::{
    AcquisitionMode, AmountApplied, CanonicalRequest, DraftField, DraftRequest, IngredientsText,
    ProductId, ScanwiseError, SkinTone, SkinType, UsageContext, UsageFrequency,
};
use std::str::FromStr;

/// Builds the canonical request the analysis service receives.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestBuilder;

impl RequestBuilder {
    /// Validate `draft` against `mode`'s contract.
    ///
    /// Fields are checked in draft order and the first failure is returned.
    /// Payload fields outside the mode are ignored whatever the draft holds.
    pub fn build(
        draft: &DraftRequest,
        mode: AcquisitionMode,
    ) -> Result<CanonicalRequest, ValidationError> {
        let product_name = optional(draft, DraftField::ProductName);
        let context = UsageContext {
            skin_type: parse_choice::<SkinType>(draft, DraftField::SkinType)?,
            skin_tone: parse_choice::<SkinTone>(draft, DraftField::SkinTone)?,
            usage_frequency: parse_choice::<UsageFrequency>(draft, DraftField::UsageFrequency)?,
            amount_applied: parse_choice::<AmountApplied>(draft, DraftField::AmountApplied)?,
        };
        let category = optional(draft, DraftField::Category);

        if mode.accepts_ingredients() {
            let ingredients = required(draft, DraftField::IngredientsText)
                .and_then(|text| IngredientsText::new(text).ok())
                .ok_or(ValidationError::Missing {
                    field: DraftField::IngredientsText,
                })?;
            Ok(CanonicalRequest::for_ingredients(
                ingredients,
                product_name,
                context,
                category,
            ))
        } else {
            let identifier = required(draft, DraftField::ProductIdentifier)
                .and_then(|id| ProductId::new(id).ok())
                .ok_or(ValidationError::Missing {
                    field: DraftField::ProductIdentifier,
                })?;
            Ok(CanonicalRequest::for_product(
                identifier,
                product_name,
                context,
                category,
            ))
        }
    }
}

/// Non-blank value of `field`.
fn required(draft: &DraftRequest, field: DraftField) -> Option<&str> {
    draft.get(field).filter(|value| !value.trim().is_empty())
}

fn optional(draft: &DraftRequest, field: DraftField) -> Option<String> {
    required(draft, field).map(|value| value.trim().to_string())
}

fn parse_choice<T>(draft: &DraftRequest, field: DraftField) -> Result<T, ValidationError>
where
    T: FromStr<Err = ScanwiseError>,
{
    let value = required(draft, field).ok_or(ValidationError::Missing { field })?;
    value.parse().map_err(|e| ValidationError::Invalid {
        field,
        reason: match e {
            ScanwiseError::Validation(reason) => reason,
            other => other.to_string(),
        },
    })
}
