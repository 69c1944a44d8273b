//! Capability interfaces for the external recognition and decoding engines.
//!
//! The engines themselves are not part of ScanWise. Implementations wrap a
//! native library, a subprocess or a remote API; see [`crate::engines`] for
//! the subprocess adapters shipped with the command-line shell.

use crate::error::Result;
use crate::image::ImageFile;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Percentage of a text recognition that has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CaptureProgress {
    /// 0 to 100
    pub percent_complete: u8,
}

impl CaptureProgress {
    /// Convert an engine fraction in [0, 1] to a percentage, clamping outliers.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_fraction(fraction: f32) -> Self {
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
        Self {
            percent_complete: (fraction * 100.0).round() as u8,
        }
    }
}

/// Optical text recognition engine.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Extract the text of `image`, reporting progress through `progress`.
    ///
    /// `language` is a hint in the engine's own notation (e.g. `eng`).
    async fn recognize(
        &self,
        image: &ImageFile,
        language: &str,
        progress: ProgressSink,
    ) -> Result<String>;

    /// Short engine name for logs.
    fn engine_id(&self) -> &str;
}

/// Barcode decoding engine.
#[async_trait]
pub trait BarcodeDecoder: Send + Sync {
    /// Decode one frame. `Ok(None)` means the frame holds no readable code.
    async fn decode(&self, frame: &ImageFile) -> Result<Option<String>>;

    /// Short engine name for logs.
    fn engine_id(&self) -> &str;
}

/// Write end of a recognition's progress sequence.
///
/// Reports are clamped to [0, 100] and only forwarded when they advance, so
/// consumers observe a non-decreasing sequence whatever the engine sends.
#[derive(Debug)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<CaptureProgress>,
    last: Option<CaptureProgress>,
}

impl ProgressSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<CaptureProgress>) -> Self {
        Self { tx, last: None }
    }

    /// Create a sink whose reports go nowhere.
    #[must_use]
    pub fn discard() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self { tx, last: None }
    }

    /// Report completion as a fraction in [0, 1].
    pub fn report(&mut self, fraction: f32) {
        let progress = CaptureProgress::from_fraction(fraction);
        if self.last.is_some_and(|last| progress <= last) {
            return;
        }
        self.last = Some(progress);
        // The consumer may have stopped listening; progress is advisory.
        let _ = self.tx.send(progress);
    }
}
