//! Subprocess-backed engines.
//!
//! These wrap the `tesseract` and `zbarimg` command-line tools. Each call
//! writes the image to a temporary file, runs the tool, and parses stdout.

mod tesseract;
mod zbar;

pub use tesseract::TesseractRecognizer;
pub use zbar::ZbarDecoder;

use crate::error::CaptureError;
use crate::image::ImageFile;
use std::io::Write;
use tempfile::NamedTempFile;

/// Spill `image` to a temporary file with a matching extension.
///
/// The file is created and written on the blocking pool.
async fn write_temp_image(image: &ImageFile) -> Result<NamedTempFile, CaptureError> {
    let suffix = format!(".{}", image.extension());
    let bytes = image.bytes().to_vec();
    tokio::task::spawn_blocking(move || -> Result<NamedTempFile, CaptureError> {
        let mut file = tempfile::Builder::new()
            .prefix("scanwise-")
            .suffix(&suffix)
            .tempfile()?;
        file.write_all(&bytes)?;
        file.flush()?;
        Ok(file)
    })
    .await
    .map_err(|e| CaptureError::Io(std::io::Error::other(e)))?
}

/// Map a spawn failure to `EngineUnavailable` when the executable is missing.
fn spawn_error(program: &str, err: std::io::Error) -> CaptureError {
    if err.kind() == std::io::ErrorKind::NotFound {
        CaptureError::EngineUnavailable(format!("{program} not found"))
    } else {
        CaptureError::Io(err)
    }
}
