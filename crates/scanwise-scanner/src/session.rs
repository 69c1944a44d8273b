//! Scan session: the state a presentation layer binds to.
//!
//! A [`ScanSession`] owns the acquisition mode, the draft, the current result
//! and the last user-facing error, and exposes them as a [`SessionSnapshot`]
//! through a `watch` channel. The lock around that state is never held
//! across an await; every suspension point re-checks identity (capture
//! ticket or submission id) before applying its outcome.

use crate::builder::RequestBuilder;
use crate::effects::{SideEffectCoordinator, SideEffectHandles, SideEffectState};
use crate::error::{Result, ScanError};
use crate::mode::{CapturePayload, CaptureTicket, ModeController};
use crate::view::ResultView;
use futures::{Stream, StreamExt};
use scanwise_auth::AuthSession;
use scanwise_capture::{
    BarcodeOutcome, CaptureAdapter, CaptureError, CaptureProgress, ImageFile, RecognitionEvent,
};
use scanwise_client::{AnalysisService, ClientError, SubmitOutcome, EMPTY_RESULT_MESSAGE};
use scanwise_core::{
    AcquisitionMode, AnalysisResult, CatalogProduct, DraftDefaults, DraftField, DraftRequest,
    FavoriteStatus, HistoryEntry, SubmissionId, UserProfile,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;

/// Shown when a decoded barcode is unknown to the service.
pub const BARCODE_NOT_FOUND_MESSAGE: &str =
    "Product not found via barcode. Try searching by name.";

/// Shown when a barcode lookup fails for any other reason.
pub const BARCODE_LOOKUP_FAILED_MESSAGE: &str = "Failed to lookup barcode.";

/// Shown when the frame stream ends without a readable barcode.
pub const NO_BARCODE_MESSAGE: &str = "No barcode detected. Try again or search by name.";

/// Read-only view of the session state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    /// Active acquisition mode
    pub mode: AcquisitionMode,
    /// Form state
    pub draft: DraftRequest,
    /// Current analysis result
    pub result: Option<AnalysisResult>,
    /// Message shown inline or in place of the result
    pub error: Option<String>,
    /// Progress of the running text recognition
    pub capture_progress: Option<CaptureProgress>,
    /// Whether a submission is awaiting the service
    pub submitting: bool,
}

/// How a capture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// The payload was applied and the session moved to Manual
    Applied,
    /// The capture was cancelled or superseded; nothing was applied
    Discarded,
    /// The frame stream ended without a readable barcode
    NoBarcode,
}

/// Successful outcome of [`ScanSession::submit`].
#[derive(Debug)]
pub enum SubmitStatus {
    /// A result is displayed and its side effects are scheduled
    Analyzed {
        /// Identity of this submission
        submission: SubmissionId,
        /// Tasks scheduled for the result
        effects: SideEffectHandles,
    },
    /// The service returned no analysis data
    Empty,
}

#[derive(Debug, Default)]
struct SessionState {
    mode: ModeController,
    draft: DraftRequest,
    result: Option<AnalysisResult>,
    submission: Option<SubmissionId>,
    pending: Option<SubmissionId>,
    error: Option<String>,
    capture_progress: Option<CaptureProgress>,
}

impl SessionState {
    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.mode.active(),
            draft: self.draft.clone(),
            result: self.result.clone(),
            error: self.error.clone(),
            capture_progress: self.capture_progress,
            submitting: self.pending.is_some(),
        }
    }

    fn select_mode(&mut self, target: AcquisitionMode) {
        self.mode.select_mode(target, &mut self.draft);
        self.capture_progress = None;
    }
}

struct SessionInner {
    service: Arc<dyn AnalysisService>,
    capture: CaptureAdapter,
    auth: AuthSession,
    effects: SideEffectCoordinator,
    state: Mutex<SessionState>,
    snapshot: watch::Sender<SessionSnapshot>,
}

/// One user's scan session.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct ScanSession {
    inner: Arc<SessionInner>,
}

impl std::fmt::Debug for ScanSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanSession")
            .field("snapshot", &self.snapshot())
            .field("effects", &self.inner.effects)
            .finish_non_exhaustive()
    }
}

impl ScanSession {
    /// Create a session in Search mode with a draft seeded from `defaults`.
    #[must_use]
    pub fn new(
        service: Arc<dyn AnalysisService>,
        capture: CaptureAdapter,
        auth: AuthSession,
        defaults: &DraftDefaults,
    ) -> Self {
        let state = SessionState {
            draft: DraftRequest::from_defaults(defaults),
            ..SessionState::default()
        };
        let (snapshot, _) = watch::channel(state.snapshot());
        let effects = SideEffectCoordinator::new(Arc::clone(&service), auth.clone());

        Self {
            inner: Arc::new(SessionInner {
                service,
                capture,
                auth,
                effects,
                state: Mutex::new(state),
                snapshot,
            }),
        }
    }

    /// Run `f` on the locked state, then publish a fresh snapshot.
    fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let output = f(&mut state);
        self.inner.snapshot.send_replace(state.snapshot());
        output
    }

    fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        let state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    /// Current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.read(SessionState::snapshot)
    }

    /// Observe the session state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Observe the side effects of the current result.
    #[must_use]
    pub fn side_effects(&self) -> watch::Receiver<SideEffectState> {
        self.inner.effects.subscribe()
    }

    /// Current side-effect state.
    #[must_use]
    pub fn side_effect_state(&self) -> SideEffectState {
        self.inner.effects.state()
    }

    /// Active acquisition mode.
    #[must_use]
    pub fn mode(&self) -> AcquisitionMode {
        self.read(|s| s.mode.active())
    }

    /// Current draft.
    #[must_use]
    pub fn draft(&self) -> DraftRequest {
        self.read(|s| s.draft.clone())
    }

    /// Current analysis result.
    #[must_use]
    pub fn result(&self) -> Option<AnalysisResult> {
        self.read(|s| s.result.clone())
    }

    /// Derive the display view of the current result.
    ///
    /// Pure: rendering never schedules side effects.
    #[must_use]
    pub fn render(&self) -> Option<ResultView> {
        self.read(|s| s.result.as_ref().map(ResultView::from_result))
    }

    /// Switch acquisition mode on explicit user action.
    ///
    /// Cancels any running capture and clears the draft fields the new mode
    /// does not use. Triggers no side effects.
    pub fn select_mode(&self, target: AcquisitionMode) {
        self.update(|s| s.select_mode(target));
    }

    /// Cancel the running capture, if any.
    pub fn cancel_capture(&self) -> bool {
        self.update(|s| {
            s.capture_progress = None;
            s.mode.cancel_capture()
        })
    }

    /// Set one draft field. An empty value clears it.
    ///
    /// # Errors
    /// Returns [`ScanError::FieldOutsideMode`] for a payload field the active
    /// mode does not use.
    pub fn update_draft_field(&self, field: DraftField, value: impl Into<String>) -> Result<()> {
        let value = value.into();
        self.update(|s| {
            let mode = s.mode.active();
            if !field.allowed_in(mode) {
                return Err(ScanError::FieldOutsideMode { field, mode });
            }
            s.draft.set(field, value);
            Ok(())
        })
    }

    /// Search the catalog. Short queries return nothing without a call.
    pub async fn search_catalog(&self, query: &str) -> Result<Vec<CatalogProduct>> {
        Ok(self.inner.service.search_catalog(query).await?)
    }

    /// Use a catalog entry as the Search-mode payload.
    ///
    /// # Errors
    /// Returns [`ScanError::FieldOutsideMode`] outside Search mode.
    pub fn select_catalog_product(&self, product: &CatalogProduct) -> Result<()> {
        self.update(|s| {
            let mode = s.mode.active();
            if mode != AcquisitionMode::Search {
                return Err(ScanError::FieldOutsideMode {
                    field: DraftField::ProductIdentifier,
                    mode,
                });
            }
            s.draft
                .set(DraftField::ProductIdentifier, product.id.clone());
            s.draft
                .set(DraftField::ProductName, product.product_name.clone());
            Ok(())
        })
    }

    fn begin_capture(&self, expected: AcquisitionMode) -> Result<CaptureTicketGuard> {
        self.update(|s| {
            let mode = s.mode.active();
            if mode != expected {
                return Err(ScanError::CaptureNotActive(mode));
            }
            let (ticket, cancel) = s.mode.begin_capture()?;
            s.capture_progress = None;
            s.error = None;
            Ok(CaptureTicketGuard { ticket, cancel })
        })
    }

    /// Record a failed capture; the user stays in the capture mode.
    fn fail_capture(&self, ticket: &CaptureTicket, message: String) -> bool {
        self.update(|s| {
            if !s.mode.on_capture_failed(ticket) {
                return false;
            }
            s.capture_progress = None;
            s.error = Some(message);
            true
        })
    }

    fn complete_capture(&self, ticket: &CaptureTicket, payload: CapturePayload) -> CaptureStatus {
        self.update(|s| {
            if s.mode.on_capture_succeeded(ticket, payload, &mut s.draft) {
                s.capture_progress = None;
                CaptureStatus::Applied
            } else {
                CaptureStatus::Discarded
            }
        })
    }

    /// Recognize an ingredient label in `OpticalCapture` mode.
    ///
    /// On success the text is written to the draft and the session moves to
    /// Manual for review. If the user leaves the mode first, the recognition
    /// is cancelled and its result discarded.
    ///
    /// # Errors
    /// Returns [`ScanError::CaptureNotActive`] outside `OpticalCapture`, or
    /// the capture error; in the latter case the mode is kept for a retry.
    pub async fn capture_text(&self, image: ImageFile) -> Result<CaptureStatus> {
        let CaptureTicketGuard { ticket, cancel } =
            self.begin_capture(AcquisitionMode::OpticalCapture)?;
        let mut events = self.inner.capture.recognize_text(image, cancel);

        while let Some(event) = events.next().await {
            match event {
                RecognitionEvent::Progress(progress) => {
                    self.update(|s| {
                        if s.mode.is_current(&ticket) {
                            s.capture_progress = Some(progress);
                        }
                    });
                }
                RecognitionEvent::Completed(text) => {
                    return Ok(self.complete_capture(&ticket, CapturePayload::from_text(text)));
                }
                RecognitionEvent::Failed(CaptureError::Cancelled) => {
                    return Ok(CaptureStatus::Discarded);
                }
                RecognitionEvent::Failed(e) => {
                    tracing::warn!("Text recognition failed: {}", e);
                    if self.fail_capture(&ticket, e.user_message()) {
                        return Err(e.into());
                    }
                    return Ok(CaptureStatus::Discarded);
                }
            }
        }
        Ok(CaptureStatus::Discarded)
    }

    /// Scan `frames` for a barcode in `BarcodeScan` mode, then look it up.
    ///
    /// Scanning stops at the first decode. A found product fills the draft
    /// and moves the session to Manual for review.
    ///
    /// # Errors
    /// Returns [`ScanError::CaptureNotActive`] outside `BarcodeScan`, the
    /// capture error, or the lookup error; the mode is kept for a retry.
    pub async fn scan_barcode<S>(&self, frames: S) -> Result<CaptureStatus>
    where
        S: Stream<Item = ImageFile> + Unpin + Send,
    {
        let CaptureTicketGuard { ticket, cancel } =
            self.begin_capture(AcquisitionMode::BarcodeScan)?;

        let barcode = match self.inner.capture.decode_barcode(frames, &cancel).await {
            Ok(BarcodeOutcome::Decoded(barcode)) => barcode,
            Ok(BarcodeOutcome::NotFound) => {
                return Ok(if self.fail_capture(&ticket, NO_BARCODE_MESSAGE.to_string()) {
                    CaptureStatus::NoBarcode
                } else {
                    CaptureStatus::Discarded
                });
            }
            Err(CaptureError::Cancelled) => return Ok(CaptureStatus::Discarded),
            Err(e) => {
                if self.fail_capture(&ticket, e.user_message()) {
                    return Err(e.into());
                }
                return Ok(CaptureStatus::Discarded);
            }
        };

        if !self.read(|s| s.mode.is_current(&ticket)) {
            return Ok(CaptureStatus::Discarded);
        }

        match self.inner.service.lookup_barcode(&barcode).await {
            Ok(product) => Ok(self.complete_capture(&ticket, CapturePayload::from_product(product))),
            Err(e) => {
                let message = match e {
                    ClientError::NotFound(_) => BARCODE_NOT_FOUND_MESSAGE,
                    _ => BARCODE_LOOKUP_FAILED_MESSAGE,
                };
                tracing::warn!("Barcode {} lookup failed: {}", barcode, e);
                if self.fail_capture(&ticket, message.to_string()) {
                    return Err(e.into());
                }
                Ok(CaptureStatus::Discarded)
            }
        }
    }

    /// Validate the draft and submit it for analysis.
    ///
    /// Validation happens before any network call; a validation error is
    /// shown inline and nothing is sent. A submission clears the displayed
    /// result. On success the new result is shown and its side effects are
    /// scheduled exactly once. On failure the draft is kept for correction.
    ///
    /// # Errors
    /// Returns [`ScanError::Validation`], [`ScanError::Client`], or
    /// [`ScanError::Superseded`] when a newer submission started meanwhile.
    pub async fn submit(&self) -> Result<SubmitStatus> {
        let (request, submission) = self.update(|s| {
            let request = match RequestBuilder::build(&s.draft, s.mode.active()) {
                Ok(request) => request,
                Err(e) => {
                    s.error = Some(e.to_string());
                    return Err(ScanError::from(e));
                }
            };
            let submission = SubmissionId::generate();
            s.pending = Some(submission);
            s.result = None;
            s.submission = None;
            s.error = None;
            Ok((request, submission))
        })?;
        self.inner.effects.reset();
        tracing::info!("Submission {} in {} mode", submission, self.mode());

        let outcome = self.inner.service.scan_product(&request).await;

        let result = self.update(|s| {
            if s.pending != Some(submission) {
                tracing::debug!("Discarding response for superseded submission {}", submission);
                return Err(ScanError::Superseded);
            }
            s.pending = None;
            match outcome {
                Ok(SubmitOutcome::Analysis(result)) => {
                    s.result = Some(result.clone());
                    s.submission = Some(submission);
                    Ok(Some(result))
                }
                Ok(SubmitOutcome::Empty) => {
                    s.error = Some(EMPTY_RESULT_MESSAGE.to_string());
                    Ok(None)
                }
                Err(e) => {
                    tracing::warn!("Submission {} failed: {}", submission, e);
                    s.result = None;
                    s.error = Some(e.user_message());
                    Err(ScanError::from(e))
                }
            }
        })?;

        match result {
            Some(result) => {
                let effects =
                    self.inner
                        .effects
                        .on_analysis_succeeded(submission, &result, request.category());
                Ok(SubmitStatus::Analyzed {
                    submission,
                    effects,
                })
            }
            None => Ok(SubmitStatus::Empty),
        }
    }

    /// Add the displayed product to the user's favorites.
    ///
    /// # Errors
    /// Returns [`ScanError::NoResult`] without a result,
    /// [`ScanError::NotAuthenticated`] when signed out, or the service error.
    pub async fn add_favorite(&self) -> Result<FavoriteStatus> {
        let (submission, result) = self
            .read(|s| s.submission.zip(s.result.clone()))
            .ok_or(ScanError::NoResult)?;
        self.inner.effects.add_favorite(submission, &result).await
    }

    /// List the signed-in user's scan history.
    pub async fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        if !self.inner.auth.is_signed_in() {
            return Err(ScanError::NotAuthenticated);
        }
        Ok(self.inner.service.fetch_history().await?)
    }

    /// Seed the draft's skin type and tone from stored preferences.
    pub fn apply_profile(&self, profile: &UserProfile) {
        self.update(|s| {
            let fields = [
                (DraftField::SkinType, profile.skin_type.as_deref()),
                (DraftField::SkinTone, profile.skin_tone.as_deref()),
            ];
            for (field, value) in fields {
                if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                    s.draft.set(field, value);
                }
            }
        });
    }

    /// Load the signed-in user's preferences and apply them to the draft.
    pub async fn load_profile(&self) -> Result<UserProfile> {
        if !self.inner.auth.is_signed_in() {
            return Err(ScanError::NotAuthenticated);
        }
        let profile = self.inner.service.fetch_profile().await?;
        self.apply_profile(&profile);
        Ok(profile)
    }

    /// Store the signed-in user's preferences.
    pub async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        if !self.inner.auth.is_signed_in() {
            return Err(ScanError::NotAuthenticated);
        }
        Ok(self.inner.service.save_profile(profile).await?)
    }
}

struct CaptureTicketGuard {
    ticket: CaptureTicket,
    cancel: tokio_util::sync::CancellationToken,
}
