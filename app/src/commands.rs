//! Command handlers. Each returns the JSON document printed on success.

use crate::error::CommandError;
use crate::state::AppState;
use clap::Args;
use futures::stream;
use scanwise_capture::ImageFile;
use scanwise_core::{AcquisitionMode, DraftField, UserProfile};
use scanwise_scanner::{CaptureStatus, ScanError, ScanSession, SubmitStatus, NO_BARCODE_MESSAGE};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

type CommandResult = Result<Value, CommandError>;

/// Usage context and product details shared by every analysis command.
#[derive(Args, Debug, Default)]
pub struct UsageArgs {
    /// Display name of the product
    #[arg(long)]
    pub name: Option<String>,
    /// Normal, Dry, Oily, Combination or Sensitive
    #[arg(long)]
    pub skin_type: Option<String>,
    /// Fair, Medium or Dark
    #[arg(long)]
    pub skin_tone: Option<String>,
    /// Daily, Weekly or Occasional
    #[arg(long)]
    pub frequency: Option<String>,
    /// Pea, Normal or Generous
    #[arg(long)]
    pub amount: Option<String>,
    /// Product category, used to suggest alternatives
    #[arg(long)]
    pub category: Option<String>,
    /// Add the analyzed product to favorites
    #[arg(long, default_value_t = false)]
    pub favorite: bool,
}

impl UsageArgs {
    fn apply(&self, session: &ScanSession) -> Result<(), ScanError> {
        let fields = [
            (DraftField::ProductName, &self.name),
            (DraftField::SkinType, &self.skin_type),
            (DraftField::SkinTone, &self.skin_tone),
            (DraftField::UsageFrequency, &self.frequency),
            (DraftField::AmountApplied, &self.amount),
            (DraftField::Category, &self.category),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                session.update_draft_field(field, value.clone())?;
            }
        }
        Ok(())
    }
}

/// Submit the draft, wait for the side effects, and report everything.
async fn submit(state: &AppState, usage: &UsageArgs) -> CommandResult {
    let session = &state.session;
    usage.apply(session)?;

    match session.submit().await? {
        SubmitStatus::Analyzed { effects, .. } => effects.settle().await,
        SubmitStatus::Empty => {
            let message = session.snapshot().error.unwrap_or_default();
            return Err(CommandError::new("EMPTY_RESULT", message));
        }
    }

    let favorite = if usage.favorite {
        let status = session.add_favorite().await?;
        Some(status.message())
    } else {
        None
    };

    Ok(json!({
        "mode": session.mode(),
        "result": session.render(),
        "side_effects": session.side_effect_state(),
        "favorite": favorite,
    }))
}

/// Analyze a typed ingredient list.
pub async fn analyze(state: &AppState, ingredients: &str, usage: &UsageArgs) -> CommandResult {
    state.session.select_mode(AcquisitionMode::Manual);
    state
        .session
        .update_draft_field(DraftField::IngredientsText, ingredients)?;
    submit(state, usage).await
}

/// Analyze a catalog product by id.
pub async fn product(state: &AppState, id: &str, usage: &UsageArgs) -> CommandResult {
    state.session.select_mode(AcquisitionMode::Search);
    state
        .session
        .update_draft_field(DraftField::ProductIdentifier, id)?;
    submit(state, usage).await
}

/// Search the catalog.
pub async fn search(state: &AppState, query: &str) -> CommandResult {
    let products = state.session.search_catalog(query).await?;
    Ok(json!({ "query": query, "products": products }))
}

async fn open_image(state: &AppState, path: &Path) -> Result<ImageFile, CommandError> {
    ImageFile::open(path, state.config.capture.max_image_bytes)
        .await
        .map_err(|e| CommandError::from(ScanError::from(e)))
}

/// Recognize a label photo, then analyze the extracted ingredients.
pub async fn ocr(state: &AppState, image: &Path, usage: &UsageArgs) -> CommandResult {
    let session = &state.session;
    let image = open_image(state, image).await?;
    session.select_mode(AcquisitionMode::OpticalCapture);

    let mut snapshots = session.subscribe();
    let progress = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            if let Some(progress) = snapshots.borrow_and_update().capture_progress {
                tracing::info!("Recognizing text: {}%", progress.percent_complete);
            }
        }
    });
    let status = session.capture_text(image).await;
    progress.abort();

    match status? {
        CaptureStatus::Applied => {
            tracing::info!("Extracted: {}", session.draft().ingredients_text.unwrap_or_default());
            submit(state, usage).await
        }
        CaptureStatus::Discarded | CaptureStatus::NoBarcode => Err(CommandError::new(
            "CAPTURE_DISCARDED",
            "Text recognition did not complete.",
        )),
    }
}

/// Decode a barcode from camera frames, look it up, then analyze it.
pub async fn barcode(state: &AppState, frames: &[PathBuf], usage: &UsageArgs) -> CommandResult {
    let session = &state.session;
    let mut images = Vec::with_capacity(frames.len());
    for path in frames {
        images.push(open_image(state, path).await?);
    }
    session.select_mode(AcquisitionMode::BarcodeScan);

    match session.scan_barcode(stream::iter(images)).await? {
        CaptureStatus::Applied => submit(state, usage).await,
        CaptureStatus::NoBarcode => Err(CommandError::new("NO_BARCODE", NO_BARCODE_MESSAGE)),
        CaptureStatus::Discarded => Err(CommandError::new(
            "CAPTURE_DISCARDED",
            "Barcode scan did not complete.",
        )),
    }
}

/// List the signed-in user's scan history.
pub async fn history(state: &AppState) -> CommandResult {
    let entries = state.session.load_history().await?;
    Ok(json!({ "user": state.auth.user().map(|u| u.uid), "history": entries }))
}

/// Show the stored preferences, updating them first when any is given.
pub async fn profile(
    state: &AppState,
    skin_type: Option<String>,
    skin_tone: Option<String>,
    theme: Option<String>,
) -> CommandResult {
    let session = &state.session;
    let mut profile = session.load_profile().await?;

    if skin_type.is_some() || skin_tone.is_some() || theme.is_some() {
        profile = UserProfile {
            skin_type: skin_type.or(profile.skin_type),
            skin_tone: skin_tone.or(profile.skin_tone),
            theme_preference: theme.or(profile.theme_preference),
        };
        session.save_profile(&profile).await?;
        tracing::info!("Profile saved");
    }

    Ok(json!({ "profile": profile }))
}

/// Print the effective configuration, writing it first when `save` is given.
///
/// `save` carries the explicit config path, `None` inside meaning the default
/// location.
pub fn config(state: &AppState, save: Option<Option<PathBuf>>) -> CommandResult {
    if let Some(path) = save {
        let saved = match path {
            Some(path) => state.config.save_to(&path),
            None => state.config.save(),
        };
        saved.map_err(|e| CommandError::new("CONFIG_ERROR", e.to_string()))?;
        tracing::info!("Configuration saved");
    }
    serde_json::to_value(&state.config)
        .map_err(|e| CommandError::new("SERIALIZATION_ERROR", e.to_string()))
}
