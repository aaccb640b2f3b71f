use std::io;
use thiserror::Error;

/// Result type for the rendering core
pub type Result<T> = std::result::Result<T, WaterfallError>;

/// Errors raised while configuring or running the waterfall pipeline
#[derive(Error, Debug)]
pub enum WaterfallError {
    /// Rejected before any frame is processed
    #[error("Configuration error: {0}")]
    Config(String),

    /// The sample source ran dry in the middle of a frame
    #[error("Sample source exhausted: needed {needed} samples, got {available}")]
    SourceExhausted { needed: usize, available: usize },

    #[error("Window size mismatch: window has {window} coefficients, frame has {frame} samples")]
    WindowSizeMismatch { window: usize, frame: usize },

    /// A row handed to the image sink does not fit its declared geometry
    #[error("Row mismatch: image rows hold {expected} bytes, got {got}")]
    RowMismatch { expected: usize, got: usize },

    #[error("Image already holds all {height} rows")]
    ImageFull { height: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Image encoding failed: {0}")]
    Png(#[from] png::EncodingError),

    #[error("Malformed SigMF metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

impl WaterfallError {
    pub fn config(msg: impl Into<String>) -> Self {
        WaterfallError::Config(msg.into())
    }
}
