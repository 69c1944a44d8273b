use super::{spawn_error, write_temp_image};
use crate::engine::{ProgressSink, TextRecognizer};
use crate::error::{CaptureError, Result};
use crate::image::ImageFile;
use async_trait::async_trait;
use tokio::process::Command;

/// Text recognition through the `tesseract` CLI.
///
/// The CLI reports no incremental progress, so the sink only sees the start
/// and the end of the run.
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    program: String,
}

impl TesseractRecognizer {
    /// Use the executable at `program` (a path or a name on `PATH`).
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize(
        &self,
        image: &ImageFile,
        language: &str,
        mut progress: ProgressSink,
    ) -> Result<String> {
        let file = write_temp_image(image).await?;
        progress.report(0.0);

        let mut command = Command::new(&self.program);
        command
            .arg(file.path())
            .arg("stdout")
            .arg("-l")
            .arg(language)
            .kill_on_drop(true);

        tracing::debug!("Running {} on {}", self.program, image.name());
        let output = command
            .output()
            .await
            .map_err(|e| spawn_error(&self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("{} exited with {}: {}", self.program, output.status, stderr.trim());
            return Err(CaptureError::Recognition(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        progress.report(1.0);
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn engine_id(&self) -> &str {
        "tesseract"
    }
}
