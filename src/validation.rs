use crate::constants::{
    DEFAULT_ALLOWED_MEDIA_TYPES, DEFAULT_MAX_FILE_SIZE, DEFAULT_MIN_HEIGHT, DEFAULT_MIN_WIDTH,
};
use crate::error::Result;
use crate::formats::media_type_label;
use crate::processing::{decode_image, Dimensions, SourceImage};
use image::ImageReader;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;

/// Reason a file was turned away before any processing happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("File is too large: {size} bytes (maximum {max_size} bytes)")]
    TooLarge { size: u64, max_size: u64 },

    #[error("Unsupported file type {media_type} (allowed: {allowed})")]
    UnsupportedType { media_type: String, allowed: String },

    #[error("Image file is corrupted or unreadable")]
    Corrupted,

    #[error("Image is too small: {width}x{height} (minimum {min_width}x{min_height})")]
    TooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationOptions {
    pub max_size: u64,
    pub allowed_types: Vec<String>,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: DEFAULT_ALLOWED_MEDIA_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            min_width: DEFAULT_MIN_WIDTH,
            min_height: DEFAULT_MIN_HEIGHT,
        }
    }
}

impl ValidationOptions {
    pub fn allows(&self, media_type: &str) -> bool {
        self.allowed_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(media_type))
    }

    fn allowed_labels(&self) -> String {
        self.allowed_types
            .iter()
            .map(|t| media_type_label(t))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub valid: bool,
    pub reason: Option<ValidationError>,
    /// Measured size, present whenever the header could be read.
    pub dimensions: Option<Dimensions>,
}

impl ValidationVerdict {
    fn pass(dimensions: Dimensions) -> Self {
        Self {
            valid: true,
            reason: None,
            dimensions: Some(dimensions),
        }
    }

    fn fail(reason: ValidationError, dimensions: Option<Dimensions>) -> Self {
        Self {
            valid: false,
            reason: Some(reason),
            dimensions,
        }
    }

    pub fn into_result(self) -> Result<Option<Dimensions>> {
        match self.reason {
            Some(reason) => Err(reason.into()),
            None => Ok(self.dimensions),
        }
    }
}

/// Reads pixel dimensions from the image header without decoding pixels.
pub fn read_dimensions(data: &[u8]) -> Option<Dimensions> {
    let (width, height) = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;

    (width > 0 && height > 0).then(|| Dimensions::new(width, height))
}

/// Pre-flight gate: size, media type, a full decode and minimum dimensions,
/// checked in that order. The first failing rule wins.
pub fn validate_image(source: &SourceImage, options: &ValidationOptions) -> ValidationVerdict {
    if source.size() > options.max_size {
        return ValidationVerdict::fail(
            ValidationError::TooLarge {
                size: source.size(),
                max_size: options.max_size,
            },
            None,
        );
    }

    if !options.allows(&source.media_type) {
        return ValidationVerdict::fail(
            ValidationError::UnsupportedType {
                media_type: source.media_type.clone(),
                allowed: options.allowed_labels(),
            },
            None,
        );
    }

    // a readable header is not enough; truncated pixel data must fail here too
    let dimensions = match decode_image(&source.data) {
        Ok(img) => Dimensions::of(&img),
        Err(_) => {
            return ValidationVerdict::fail(
                ValidationError::Corrupted,
                read_dimensions(&source.data),
            )
        }
    };

    if dimensions.width < options.min_width || dimensions.height < options.min_height {
        return ValidationVerdict::fail(
            ValidationError::TooSmall {
                width: dimensions.width,
                height: dimensions.height,
                min_width: options.min_width,
                min_height: options.min_height,
            },
            Some(dimensions),
        );
    }

    ValidationVerdict::pass(dimensions)
}
