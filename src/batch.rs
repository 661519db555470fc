use crate::error::{PipelineError, Result};
use crate::processing::SourceImage;
use crate::utils::is_image_file;
use crate::validation::{validate_image, ValidationError, ValidationOptions};
use glob::glob;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Files that passed pre-flight, and the ones turned away with their reason.
#[derive(Debug, Default)]
pub struct PreflightReport {
    pub accepted: Vec<SourceImage>,
    pub rejected: Vec<(String, ValidationError)>,
}

impl PreflightReport {
    pub fn rejection_messages(&self) -> Vec<String> {
        self.rejected
            .iter()
            .map(|(name, reason)| format!("{}: {}", name, reason))
            .collect()
    }
}

/// Resolves one input (file, directory or glob pattern) into image paths.
pub fn collect_image_files(input: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut image_files = Vec::new();

    let input_path = Path::new(input);
    let canonical_input = if input_path.exists() {
        input_path
            .canonicalize()
            .map_err(|_| PipelineError::NoImageFilesFound(input.to_string()))?
    } else {
        input_path.to_path_buf()
    };

    if canonical_input.is_file() {
        image_files.push(canonical_input);
    } else if canonical_input.is_dir() {
        let walker = if recursive {
            WalkDir::new(&canonical_input).into_iter()
        } else {
            WalkDir::new(&canonical_input).max_depth(1).into_iter()
        };

        for entry in walker.filter_entry(|e| {
            e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.')
        }) {
            let entry = entry?;
            let path = entry.path();

            if path.is_file() && is_image_file(path) {
                if let Ok(canonical_path) = path.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else if let Ok(pattern) = glob(input) {
        for entry in pattern.flatten() {
            if entry.is_file() && is_image_file(&entry) {
                if let Ok(canonical_path) = entry.canonicalize() {
                    image_files.push(canonical_path);
                }
            }
        }
    } else {
        return Err(PipelineError::NoImageFilesFound(input.to_string()));
    }

    image_files.sort();
    debug!("{} image file(s) found in {}", image_files.len(), input);
    Ok(image_files)
}

/// Collects several inputs in order, dropping duplicates.
pub fn collect_inputs(inputs: &[String], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for input in inputs {
        for path in collect_image_files(input, recursive)? {
            if !files.contains(&path) {
                files.push(path);
            }
        }
    }

    if files.is_empty() {
        return Err(PipelineError::NoImageFilesFound(inputs.join(", ")));
    }
    Ok(files)
}

pub fn check_batch_limit(count: usize, max_files: usize) -> Result<()> {
    if count > max_files {
        return Err(PipelineError::BatchFileLimitExceeded(count, max_files));
    }
    Ok(())
}

pub fn load_sources(paths: &[PathBuf]) -> Result<Vec<SourceImage>> {
    paths.iter().map(|path| SourceImage::from_path(path)).collect()
}

/// Splits sources into those that pass validation and those that do not.
pub fn preflight(sources: Vec<SourceImage>, options: &ValidationOptions) -> PreflightReport {
    let mut report = PreflightReport::default();

    for source in sources {
        let verdict = validate_image(&source, options);
        match verdict.reason {
            None => report.accepted.push(source),
            Some(reason) => {
                debug!("Rejected {}: {}", source.name, reason);
                report.rejected.push((source.name, reason));
            }
        }
    }

    report
}
