//! Capture adapter: drives the engines and turns their output into payloads.
//!
//! Text recognition is exposed as a lazy stream of [`RecognitionEvent`]s.
//! Nothing runs until the stream is polled, each call produces a fresh
//! stream, and the stream always ends with exactly one terminal event after
//! every progress update. Barcode decoding consumes a live frame stream and
//! stops at the first successful decode.

use crate::engine::{BarcodeDecoder, CaptureProgress, ProgressSink, TextRecognizer};
use crate::error::{CaptureError, Result};
use crate::image::ImageFile;
use crate::text::normalize_extracted_text;
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream};
use futures::{FutureExt, Stream, StreamExt};
use scanwise_core::{CaptureConfig, ProductId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One item of a text recognition stream.
#[derive(Debug)]
pub enum RecognitionEvent {
    /// Recognition advanced; percentages never decrease within one stream
    Progress(CaptureProgress),
    /// Terminal: normalized ingredient text
    Completed(String),
    /// Terminal: the recognition failed or was cancelled
    Failed(CaptureError),
}

impl RecognitionEvent {
    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Result of a barcode scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarcodeOutcome {
    /// A product identifier was read
    Decoded(ProductId),
    /// The frame stream ended without a readable code
    NotFound,
}

enum RecognitionState {
    Running {
        work: BoxFuture<'static, RecognitionEvent>,
        progress: mpsc::UnboundedReceiver<CaptureProgress>,
    },
    Draining {
        terminal: RecognitionEvent,
        progress: mpsc::UnboundedReceiver<CaptureProgress>,
    },
    Done,
}

/// Wraps a recognition engine and a barcode engine behind the capture rules.
#[derive(Clone)]
pub struct CaptureAdapter {
    recognizer: Arc<dyn TextRecognizer>,
    decoder: Arc<dyn BarcodeDecoder>,
    max_image_bytes: u64,
    language: String,
}

impl std::fmt::Debug for CaptureAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureAdapter")
            .field("recognizer", &self.recognizer.engine_id())
            .field("decoder", &self.decoder.engine_id())
            .field("max_image_bytes", &self.max_image_bytes)
            .field("language", &self.language)
            .finish()
    }
}

impl CaptureAdapter {
    /// Create an adapter with the size ceiling and language from `config`.
    #[must_use]
    pub fn new(
        recognizer: Arc<dyn TextRecognizer>,
        decoder: Arc<dyn BarcodeDecoder>,
        config: &CaptureConfig,
    ) -> Self {
        Self {
            recognizer,
            decoder,
            max_image_bytes: config.max_image_bytes,
            language: config.ocr_language.clone(),
        }
    }

    /// Recognize the ingredient text of `image`.
    ///
    /// The image is checked for size and media type before the engine is
    /// invoked. Cancelling `cancel` ends the stream with
    /// [`CaptureError::Cancelled`].
    #[must_use]
    pub fn recognize_text(
        &self,
        image: ImageFile,
        cancel: CancellationToken,
    ) -> BoxStream<'static, RecognitionEvent> {
        let (tx, progress) = mpsc::unbounded_channel();
        let sink = ProgressSink::new(tx);
        let recognizer = Arc::clone(&self.recognizer);
        let language = self.language.clone();
        let max_image_bytes = self.max_image_bytes;

        let work = async move {
            match run_recognition(recognizer, image, &language, max_image_bytes, sink, cancel).await
            {
                Ok(text) => RecognitionEvent::Completed(text),
                Err(e) => RecognitionEvent::Failed(e),
            }
        }
        .boxed();

        stream::unfold(
            RecognitionState::Running { work, progress },
            |mut state| async move {
                loop {
                    state = match state {
                        RecognitionState::Running {
                            mut work,
                            mut progress,
                        } => {
                            tokio::select! {
                                biased;
                                Some(update) = progress.recv() => {
                                    return Some((
                                        RecognitionEvent::Progress(update),
                                        RecognitionState::Running { work, progress },
                                    ));
                                }
                                terminal = &mut work => {
                                    RecognitionState::Draining { terminal, progress }
                                }
                            }
                        }
                        RecognitionState::Draining {
                            terminal,
                            mut progress,
                        } => {
                            if let Ok(update) = progress.try_recv() {
                                return Some((
                                    RecognitionEvent::Progress(update),
                                    RecognitionState::Draining { terminal, progress },
                                ));
                            }
                            return Some((terminal, RecognitionState::Done));
                        }
                        RecognitionState::Done => return None,
                    };
                }
            },
        )
        .boxed()
    }

    /// Scan `frames` until one decodes to a product identifier.
    ///
    /// Returns after the first decode without polling further frames.
    /// Non-image frames and frames without a readable code are skipped.
    /// An unavailable engine ends the scan with an error; other per-frame
    /// decode failures are logged and skipped.
    pub async fn decode_barcode<S>(
        &self,
        mut frames: S,
        cancel: &CancellationToken,
    ) -> Result<BarcodeOutcome>
    where
        S: Stream<Item = ImageFile> + Unpin + Send,
    {
        let mut scanned = 0usize;
        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CaptureError::Cancelled),
                frame = frames.next() => frame,
            };
            let Some(frame) = frame else {
                tracing::debug!("Frame stream ended after {} frames without a barcode", scanned);
                return Ok(BarcodeOutcome::NotFound);
            };
            scanned += 1;

            if !frame.is_image() {
                tracing::debug!("Skipping non-image frame {}", frame.name());
                continue;
            }

            let decoded = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CaptureError::Cancelled),
                decoded = self.decoder.decode(&frame) => decoded,
            };

            match decoded {
                Ok(Some(code)) => match ProductId::new(code) {
                    Ok(id) => {
                        tracing::info!(
                            "Decoded barcode {} with {} after {} frames",
                            id,
                            self.decoder.engine_id(),
                            scanned
                        );
                        return Ok(BarcodeOutcome::Decoded(id));
                    }
                    Err(_) => tracing::debug!("Ignoring blank barcode in {}", frame.name()),
                },
                Ok(None) => {}
                Err(e @ CaptureError::EngineUnavailable(_)) => return Err(e),
                Err(e) => tracing::warn!("Barcode decode failed on {}: {}", frame.name(), e),
            }
        }
    }
}

async fn run_recognition(
    recognizer: Arc<dyn TextRecognizer>,
    image: ImageFile,
    language: &str,
    max_image_bytes: u64,
    progress: ProgressSink,
    cancel: CancellationToken,
) -> Result<String> {
    if !image.is_image() {
        return Err(CaptureError::UnsupportedMediaType(
            image.media_type().to_string(),
        ));
    }
    if image.len() > max_image_bytes {
        return Err(CaptureError::FileTooLarge {
            size: image.len(),
            limit: max_image_bytes,
        });
    }
    if image.is_empty() {
        return Err(CaptureError::Recognition("image is empty".to_string()));
    }

    tracing::debug!(
        "Recognizing {} ({} bytes) with {}",
        image.name(),
        image.len(),
        recognizer.engine_id()
    );

    let raw = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!("Recognition of {} cancelled", image.name());
            return Err(CaptureError::Cancelled);
        }
        raw = recognizer.recognize(&image, language, progress) => raw?,
    };

    normalize_extracted_text(&raw)
}
