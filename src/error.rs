//! Error types for barscan operations

use thiserror::Error;

/// Result type alias using barscan's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for barscan operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input directory or manifest could not be read
    #[error("Input source error: {0}")]
    Source(String),

    /// A listed file could not be parsed as an image
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Pixel buffer construction or conversion failed
    #[error("Image processing error: {0}")]
    Image(String),

    /// Report file could not be created or written
    #[error("Report error: {0}")]
    Report(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Background decode worker was cancelled or lost
    #[error("Decode worker failed: {0}")]
    Worker(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        Error::Image(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", e))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Error::Worker(e.to_string())
    }
}
