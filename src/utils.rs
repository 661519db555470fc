//! Utility functions for common operations
//!
//! Helpers shared by the pipeline, the storage adapters and the CLI.

use crate::constants::{IMAGES_PREFIX, SUPPORTED_IMAGE_EXTENSIONS, THUMBNAILS_PREFIX};
use crate::error::{PipelineError, Result};
use chrono::Utc;
use std::path::Path;
use uuid::Uuid;

/// Check if a file path represents a supported image file
///
/// # Arguments
/// * `path` - The file path to check
///
/// # Returns
/// * `true` if the file has a supported image extension, `false` otherwise
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            SUPPORTED_IMAGE_EXTENSIONS.contains(&ext_lower.as_str())
        })
        .unwrap_or(false)
}

/// Validate that a file exists and return a descriptive error if not
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }
    Ok(())
}

/// Format file size in human-readable format
///
/// # Arguments
/// * `bytes` - Size in bytes
///
/// # Returns
/// * Human-readable size string (e.g., "1.2 MB", "512 KB")
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}

/// Percentage saved going from `original_size` to `new_size`, clamped at zero.
pub fn calculate_size_reduction(original_size: u64, new_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    let ratio = ((original_size as f64 - new_size as f64) / original_size as f64) * 100.0;
    ratio.max(0.0)
}

/// Unique, time-ordered stem shared by an image and its thumbnail.
pub fn generate_object_stem() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &id[..12])
}

pub fn image_object_key(stem: &str, extension: &str) -> String {
    format!("{}/{}.{}", IMAGES_PREFIX, stem, extension)
}

pub fn thumbnail_object_key(stem: &str, extension: &str) -> String {
    format!("{}/{}.{}", THUMBNAILS_PREFIX, stem, extension)
}

/// Joins a base URL and path segments with exactly one slash between them.
pub fn join_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(segment.trim_matches('/'));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("test.jpg")));
        assert!(is_image_file(Path::new("test.JPEG")));
        assert!(is_image_file(Path::new("test.png")));
        assert!(is_image_file(Path::new("test.webp")));
        assert!(is_image_file(Path::new("test.gif")));

        assert!(!is_image_file(Path::new("test.txt")));
        assert!(!is_image_file(Path::new("test")));
        assert!(!is_image_file(Path::new("test.heic")));
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512 B");
        assert_eq!(format_file_size(1024), "1.0 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(1024 * 1024), "1.0 MB");
        assert_eq!(format_file_size(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_calculate_size_reduction() {
        assert_eq!(calculate_size_reduction(1000, 800), 20.0);
        assert_eq!(calculate_size_reduction(1000, 1200), 0.0);
        assert_eq!(calculate_size_reduction(1000, 1000), 0.0);
        assert_eq!(calculate_size_reduction(0, 500), 0.0);
    }

    #[test]
    fn test_object_keys_share_stem() {
        let stem = generate_object_stem();
        assert_eq!(image_object_key(&stem, "webp"), format!("images/{}.webp", stem));
        assert_eq!(
            thumbnail_object_key(&stem, "webp"),
            format!("thumbnails/{}.webp", stem)
        );
    }

    #[test]
    fn test_generate_object_stem_is_unique() {
        let a = generate_object_stem();
        let b = generate_object_stem();
        assert_ne!(a, b);
        assert!(a.contains('-'));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("https://example.com/", &["storage/v1", "bucket"]),
            "https://example.com/storage/v1/bucket"
        );
        assert_eq!(
            join_url("https://example.com", &["/a/", "b"]),
            "https://example.com/a/b"
        );
    }

    #[test]
    fn test_validate_file_exists() {
        let result = validate_file_exists(Path::new("/nonexistent/file.jpg"));
        assert!(matches!(result, Err(PipelineError::FileNotFound(_))));
    }
}
