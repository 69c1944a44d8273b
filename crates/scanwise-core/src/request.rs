//! Draft and canonical analysis requests.
//!
//! A [`DraftRequest`] is the editable form state of a session. It is reshaped
//! on every mode change so that it never carries a payload from a mode that is
//! no longer active. A [`CanonicalRequest`] is the immutable value sent to the
//! analysis service; its constructors only accept already-validated payloads,
//! so an invalid canonical request cannot be built.

use crate::config::DraftDefaults;
use crate::types::{
    AcquisitionMode, AmountApplied, IngredientsText, ProductId, SkinTone, SkinType,
    UsageFrequency,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Names of the draft fields, as used in validation messages and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftField {
    /// Display name of the product
    ProductName,
    /// User skin type
    SkinType,
    /// User skin tone
    SkinTone,
    /// Usage frequency
    UsageFrequency,
    /// Amount applied per use
    AmountApplied,
    /// Free-form ingredient list (Manual / `OpticalCapture` only)
    IngredientsText,
    /// Catalog id or barcode (Search / `BarcodeScan` only)
    ProductIdentifier,
    /// Product category used for alternative lookups
    Category,
}

impl DraftField {
    /// Every draft field.
    pub const ALL: [Self; 8] = [
        Self::ProductName,
        Self::SkinType,
        Self::SkinTone,
        Self::UsageFrequency,
        Self::AmountApplied,
        Self::IngredientsText,
        Self::ProductIdentifier,
        Self::Category,
    ];

    /// Snake-case field name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProductName => "product_name",
            Self::SkinType => "skin_type",
            Self::SkinTone => "skin_tone",
            Self::UsageFrequency => "usage_frequency",
            Self::AmountApplied => "amount_applied",
            Self::IngredientsText => "ingredients_text",
            Self::ProductIdentifier => "product_identifier",
            Self::Category => "category",
        }
    }

    /// Whether the field is part of `mode`'s contract.
    ///
    /// Shared fields belong to every mode; the two payload fields belong only
    /// to the modes that produce them.
    #[must_use]
    pub fn allowed_in(self, mode: AcquisitionMode) -> bool {
        match self {
            Self::IngredientsText => mode.accepts_ingredients(),
            Self::ProductIdentifier => mode.accepts_identifier(),
            _ => true,
        }
    }
}

impl fmt::Display for DraftField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable form state for the active session.
///
/// Shared user-context fields are stored as raw strings; they are parsed into
/// their enumerated types only when a [`CanonicalRequest`] is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRequest {
    /// Product display name
    pub product_name: Option<String>,
    /// Skin type as entered
    pub skin_type: Option<String>,
    /// Skin tone as entered
    pub skin_tone: Option<String>,
    /// Usage frequency as entered
    pub usage_frequency: Option<String>,
    /// Amount applied as entered
    pub amount_applied: Option<String>,
    /// Ingredient list (Manual / `OpticalCapture` only)
    pub ingredients_text: Option<String>,
    /// Catalog id or barcode (Search / `BarcodeScan` only)
    pub product_identifier: Option<String>,
    /// Product category
    pub category: Option<String>,
}

impl DraftRequest {
    /// Create a draft pre-filled with the configured user-context defaults.
    #[must_use]
    pub fn from_defaults(defaults: &DraftDefaults) -> Self {
        Self {
            skin_type: Some(defaults.skin_type.clone()),
            skin_tone: Some(defaults.skin_tone.clone()),
            usage_frequency: Some(defaults.usage_frequency.clone()),
            amount_applied: Some(defaults.amount_applied.clone()),
            ..Self::default()
        }
    }

    /// Read a field.
    #[must_use]
    pub fn get(&self, field: DraftField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// Overwrite a field. An empty value clears it.
    ///
    /// This does not check the mode contract; callers that know the active
    /// mode go through the session, which does.
    pub fn set(&mut self, field: DraftField, value: impl Into<String>) {
        let value = value.into();
        *self.slot_mut(field) = if value.is_empty() { None } else { Some(value) };
    }

    /// Clear a field.
    pub fn clear(&mut self, field: DraftField) {
        *self.slot_mut(field) = None;
    }

    /// Drop every field that is outside `mode`'s contract.
    pub fn retain_for_mode(&mut self, mode: AcquisitionMode) {
        for field in DraftField::ALL {
            if !field.allowed_in(mode) {
                self.clear(field);
            }
        }
    }

    /// Whether the draft only holds fields that belong to `mode`.
    #[must_use]
    pub fn conforms_to(&self, mode: AcquisitionMode) -> bool {
        DraftField::ALL
            .iter()
            .all(|field| field.allowed_in(mode) || self.get(*field).is_none())
    }

    fn slot(&self, field: DraftField) -> &Option<String> {
        match field {
            DraftField::ProductName => &self.product_name,
            DraftField::SkinType => &self.skin_type,
            DraftField::SkinTone => &self.skin_tone,
            DraftField::UsageFrequency => &self.usage_frequency,
            DraftField::AmountApplied => &self.amount_applied,
            DraftField::IngredientsText => &self.ingredients_text,
            DraftField::ProductIdentifier => &self.product_identifier,
            DraftField::Category => &self.category,
        }
    }

    fn slot_mut(&mut self, field: DraftField) -> &mut Option<String> {
        match field {
            DraftField::ProductName => &mut self.product_name,
            DraftField::SkinType => &mut self.skin_type,
            DraftField::SkinTone => &mut self.skin_tone,
            DraftField::UsageFrequency => &mut self.usage_frequency,
            DraftField::AmountApplied => &mut self.amount_applied,
            DraftField::IngredientsText => &mut self.ingredients_text,
            DraftField::ProductIdentifier => &mut self.product_identifier,
            DraftField::Category => &mut self.category,
        }
    }
}

/// Validated user-context fields shared by every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsageContext {
    /// Skin type
    pub skin_type: SkinType,
    /// Skin tone
    pub skin_tone: SkinTone,
    /// Usage frequency
    pub usage_frequency: UsageFrequency,
    /// Amount applied
    pub amount_applied: AmountApplied,
}

/// Normalized payload for `POST /scan-product`.
///
/// Exactly one of `ingredients_list` and `barcode` is present. The value is
/// never mutated after construction; resubmission builds a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRequest {
    product_name: String,
    #[serde(flatten)]
    context: UsageContext,
    ingredients_list: Option<String>,
    barcode: Option<String>,
    category: Option<String>,
}

impl CanonicalRequest {
    /// Request an analysis of a catalog product (Search / `BarcodeScan`).
    #[must_use]
    pub fn for_product(
        identifier: ProductId,
        product_name: Option<String>,
        context: UsageContext,
        category: Option<String>,
    ) -> Self {
        Self {
            product_name: product_name.unwrap_or_default(),
            context,
            ingredients_list: None,
            barcode: Some(identifier.into()),
            category,
        }
    }

    /// Request an analysis of an ingredient list (Manual / `OpticalCapture`).
    #[must_use]
    pub fn for_ingredients(
        ingredients: IngredientsText,
        product_name: Option<String>,
        context: UsageContext,
        category: Option<String>,
    ) -> Self {
        Self {
            product_name: product_name.unwrap_or_default(),
            context,
            ingredients_list: Some(ingredients.into()),
            barcode: None,
            category,
        }
    }

    /// Product display name (may be empty).
    #[must_use]
    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    /// Validated user context.
    #[must_use]
    pub fn context(&self) -> UsageContext {
        self.context
    }

    /// Ingredient list, for ingredient-based requests.
    #[must_use]
    pub fn ingredients_text(&self) -> Option<&str> {
        self.ingredients_list.as_deref()
    }

    /// Product identifier, for catalog-based requests.
    #[must_use]
    pub fn product_identifier(&self) -> Option<&str> {
        self.barcode.as_deref()
    }

    /// Product category, if known.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}
