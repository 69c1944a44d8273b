//! Still images handed to the capture engines.

use crate::error::{CaptureError, Result};
use std::path::Path;

/// One still image: an uploaded file or a single camera frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    name: String,
    media_type: String,
    bytes: Vec<u8>,
}

impl ImageFile {
    /// Wrap in-memory image data.
    #[must_use]
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }

    /// Read an image from disk.
    ///
    /// The size is checked against `max_bytes` from the file metadata before
    /// the contents are read. The media type is inferred from the extension.
    pub async fn open(path: &Path, max_bytes: u64) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        if metadata.len() > max_bytes {
            return Err(CaptureError::FileTooLarge {
                size: metadata.len(),
                limit: max_bytes,
            });
        }

        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

        Ok(Self::new(name, media_type_for_path(path), bytes))
    }

    /// File name (or frame label).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// MIME type, e.g. `image/png`.
    #[must_use]
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Encoded image data.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Whether the image holds no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether the media type is an `image/*` type.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.media_type
            .split('/')
            .next()
            .is_some_and(|top| top.trim().eq_ignore_ascii_case("image"))
            && self.media_type.contains('/')
    }

    /// File extension matching the media type, for engines that need a path.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.media_type.to_ascii_lowercase().as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            "image/tiff" => "tiff",
            _ => "img",
        }
    }
}

/// Infer a media type from a file extension.
#[must_use]
pub fn media_type_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}
