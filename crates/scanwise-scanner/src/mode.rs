//! Acquisition mode state machine.
//!
//! The controller owns the active mode and the in-flight capture, if any.
//! Every capture is identified by a [`CaptureTicket`]; a completion is only
//! applied while its ticket is still the current one, so a capture that
//! finishes after the user switched modes never touches the draft.

use crate::error::{Result, ScanError};
use scanwise_core::{AcquisitionMode, DraftField, DraftRequest, ProductData};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identity of one capture attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureTicket {
    id: Uuid,
    mode: AcquisitionMode,
}

impl CaptureTicket {
    /// Mode the capture was started in.
    #[must_use]
    pub fn mode(&self) -> AcquisitionMode {
        self.mode
    }
}

/// Content produced by a successful capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturePayload {
    /// Extracted or looked-up ingredient list
    pub ingredients_text: Option<String>,
    /// Product name, when the capture found one
    pub product_name: Option<String>,
    /// Product category, when the capture found one
    pub category: Option<String>,
}

impl CapturePayload {
    /// Payload of a text recognition.
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            ingredients_text: Some(text.into()),
            ..Self::default()
        }
    }

    /// Payload of a barcode lookup.
    #[must_use]
    pub fn from_product(product: ProductData) -> Self {
        Self {
            ingredients_text: product.ingredients_text,
            product_name: product.product_name,
            category: product.category,
        }
    }

    /// Write the payload into `draft`.
    ///
    /// Ingredients and name are only written when present. The category always
    /// belongs to the captured product, so an absent one clears the draft's.
    fn apply_to(self, draft: &mut DraftRequest) {
        let fields = [
            (DraftField::IngredientsText, self.ingredients_text),
            (DraftField::ProductName, self.product_name),
        ];
        for (field, value) in fields {
            if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
                draft.set(field, value);
            }
        }
        match self.category.filter(|c| !c.trim().is_empty()) {
            Some(category) => draft.set(DraftField::Category, category),
            None => draft.clear(DraftField::Category),
        }
    }
}

#[derive(Debug)]
struct ActiveCapture {
    ticket: CaptureTicket,
    cancel: CancellationToken,
}

/// Long-lived per-session mode state machine. Starts in Search.
#[derive(Debug, Default)]
pub struct ModeController {
    active: AcquisitionMode,
    capture: Option<ActiveCapture>,
}

impl ModeController {
    /// Create a controller in the Search mode.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The active mode.
    #[must_use]
    pub fn active(&self) -> AcquisitionMode {
        self.active
    }

    /// Whether a capture is running.
    #[must_use]
    pub fn capture_in_flight(&self) -> bool {
        self.capture.is_some()
    }

    /// Switch to `target` on explicit user action.
    ///
    /// Cancels any in-flight capture, then drops the draft fields that do not
    /// belong to `target`.
    pub fn select_mode(&mut self, target: AcquisitionMode, draft: &mut DraftRequest) {
        self.cancel_capture();
        if self.active != target {
            tracing::info!("Mode {} -> {}", self.active, target);
        }
        self.active = target;
        draft.retain_for_mode(target);
    }

    /// Start a capture in the active mode, replacing any running one.
    ///
    /// # Errors
    /// Returns [`ScanError::CaptureNotActive`] unless the active mode is a
    /// capture mode.
    pub fn begin_capture(&mut self) -> Result<(CaptureTicket, CancellationToken)> {
        if !self.active.is_capture() {
            return Err(ScanError::CaptureNotActive(self.active));
        }
        self.cancel_capture();

        let ticket = CaptureTicket {
            id: Uuid::new_v4(),
            mode: self.active,
        };
        let cancel = CancellationToken::new();
        self.capture = Some(ActiveCapture {
            ticket,
            cancel: cancel.clone(),
        });
        tracing::debug!("Capture {} started in {} mode", ticket.id, ticket.mode);
        Ok((ticket, cancel))
    }

    /// Whether `ticket` belongs to the capture that is still running.
    #[must_use]
    pub fn is_current(&self, ticket: &CaptureTicket) -> bool {
        self.capture
            .as_ref()
            .is_some_and(|capture| capture.ticket == *ticket && self.active == ticket.mode)
    }

    /// Cancel the running capture. Returns whether there was one.
    pub fn cancel_capture(&mut self) -> bool {
        match self.capture.take() {
            Some(capture) => {
                tracing::debug!("Cancelling capture {}", capture.ticket.id);
                capture.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Apply a capture result and move to Manual for review.
    ///
    /// Returns `false`, leaving mode and draft untouched, when the ticket is
    /// stale.
    pub fn on_capture_succeeded(
        &mut self,
        ticket: &CaptureTicket,
        payload: CapturePayload,
        draft: &mut DraftRequest,
    ) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                "Discarding late {} capture {} (active mode {})",
                ticket.mode,
                ticket.id,
                self.active
            );
            return false;
        }

        self.capture = None;
        tracing::info!("Capture {} succeeded, mode {} -> manual", ticket.id, self.active);
        self.active = AcquisitionMode::Manual;
        draft.retain_for_mode(AcquisitionMode::Manual);
        payload.apply_to(draft);
        true
    }

    /// Record a failed capture. The mode is kept so the user can retry.
    ///
    /// Returns `false` when the ticket is stale.
    pub fn on_capture_failed(&mut self, ticket: &CaptureTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.capture = None;
        true
    }
}
