//! ScanWise Capture Adapters
//!
//! Turns a still image or a live frame stream into analysis input:
//!
//! - **Text recognition**: a photographed ingredient label becomes a
//!   normalized ingredient list, with incremental progress
//! - **Barcode decoding**: a camera stream becomes a product identifier,
//!   stopping after the first successful decode
//!
//! The recognition and decoding engines sit behind the [`TextRecognizer`] and
//! [`BarcodeDecoder`] traits. Every capture can be cancelled through a
//! [`CancellationToken`](tokio_util::sync::CancellationToken).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod adapter;
pub mod engine;
pub mod engines;
#[allow(missing_docs)]
pub mod error;
pub mod image;
pub mod text;

pub use adapter::{BarcodeOutcome, CaptureAdapter, RecognitionEvent};
pub use engine::{BarcodeDecoder, CaptureProgress, ProgressSink, TextRecognizer};
pub use engines::{TesseractRecognizer, ZbarDecoder};
pub use error::{CaptureError, Result};
pub use image::ImageFile;
pub use text::normalize_extracted_text;
