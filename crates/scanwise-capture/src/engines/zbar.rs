use super::{spawn_error, write_temp_image};
use crate::engine::BarcodeDecoder;
use crate::error::{CaptureError, Result};
use crate::image::ImageFile;
use async_trait::async_trait;
use tokio::process::Command;

/// `zbarimg` exit status when the image holds no barcode.
const EXIT_NO_SYMBOL: i32 = 4;

/// Barcode decoding through the `zbarimg` CLI.
#[derive(Debug, Clone)]
pub struct ZbarDecoder {
    program: String,
}

impl ZbarDecoder {
    /// Use the executable at `program` (a path or a name on `PATH`).
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// First non-blank line of `zbarimg --raw` output.
fn first_symbol(stdout: &[u8]) -> Option<String> {
    String::from_utf8_lossy(stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl BarcodeDecoder for ZbarDecoder {
    async fn decode(&self, frame: &ImageFile) -> Result<Option<String>> {
        let file = write_temp_image(frame).await?;

        let output = Command::new(&self.program)
            .arg("--raw")
            .arg("-q")
            .arg(file.path())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(&self.program, e))?;

        match output.status.code() {
            Some(0) => Ok(first_symbol(&output.stdout)),
            Some(EXIT_NO_SYMBOL) => Ok(None),
            _ => Err(CaptureError::Decode(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ))),
        }
    }

    fn engine_id(&self) -> &str {
        "zbarimg"
    }
}
