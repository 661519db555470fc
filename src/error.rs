use crate::validation::ValidationError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),

    #[error("Invalid quality value: {0}. Must be greater than 0 and at most 1")]
    InvalidQuality(f32),

    #[error("Invalid image dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("Batch file count limit exceeded: {0} files, maximum allowed {1}")]
    BatchFileLimitExceeded(usize, usize),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Failed to save photo record: {0}")]
    Persistence(String),

    #[error("Venue not found: {0}")]
    VenueNotFound(String),

    #[error("Photo not found: {0}")]
    PhotoNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Startup did not finish within {0:?}")]
    StartupTimeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<image::ImageError> for PipelineError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Encoding(e) => PipelineError::Encode(e.to_string()),
            image::ImageError::IoError(e) => PipelineError::Io(e),
            other => PipelineError::Decode(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
