use thiserror::Error;

pub type Result<T> = std::result::Result<T, CaptureError>;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("image is {size} bytes, limit is {limit} bytes")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("barcode decoding failed: {0}")]
    Decode(String),

    #[error("capture engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("capture cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// Message shown to the user, who stays in the capture mode to retry.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::FileTooLarge { limit, .. } => {
                format!("Image is too large. The limit is {} MB.", limit / (1024 * 1024))
            }
            Self::UnsupportedMediaType(_) => "Please choose an image file (PNG, JPG).".to_string(),
            Self::Recognition(_) => "Failed to extract text. Please try a clearer image.".to_string(),
            Self::Decode(_) => "Could not read the barcode. Please try again.".to_string(),
            Self::EngineUnavailable(_) => "The scanner is not available on this device.".to_string(),
            Self::Cancelled => "Capture cancelled.".to_string(),
            Self::Io(_) => "Could not read the image.".to_string(),
        }
    }
}
