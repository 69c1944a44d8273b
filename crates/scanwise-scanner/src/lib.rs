//! ScanWise Scan Orchestration
//!
//! Coordinates one user's scan from input to displayed result:
//!
//! - **Modes**: the acquisition mode state machine and capture identity
//! - **Request building**: validating the draft into a canonical request
//! - **Side effects**: history, alternatives and favorites after a result
//! - **View**: pure display derivations over a result
//! - **Session**: the state a presentation layer binds to
//!
//! # Example
//!
//! ```rust,ignore
//! use scanwise_scanner::ScanSession;
//!
//! let session = ScanSession::new(service, capture, auth, &config.defaults);
//! session.select_mode(AcquisitionMode::Manual);
//! session.update_draft_field(DraftField::IngredientsText, "aqua, parfum")?;
//! if let SubmitStatus::Analyzed { effects, .. } = session.submit().await? {
//!     effects.settle().await;
//! }
//! let view = session.render();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod builder;
pub mod effects;
#[allow(missing_docs)]
pub mod error;
pub mod mode;
pub mod session;
#[allow(missing_docs)]
pub mod view;

pub use builder::RequestBuilder;
pub use effects::{
    should_fetch_alternatives, SideEffectCoordinator, SideEffectHandles, SideEffectOutcome,
    SideEffectState,
};
pub use error::{Result, ScanError, ValidationError};
pub use mode::{CapturePayload, CaptureTicket, ModeController};
pub use session::{
    CaptureStatus, ScanSession, SessionSnapshot, SubmitStatus, BARCODE_LOOKUP_FAILED_MESSAGE,
    BARCODE_NOT_FOUND_MESSAGE, NO_BARCODE_MESSAGE,
};
pub use view::{
    has_warnings, score_bucket, IngredientRisk, IngredientView, ResultView, ScoreBucket,
    FALLBACK_TITLE,
};
