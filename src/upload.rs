//! Sequential multi-file upload with progress reporting.
//!
//! Each file goes through the privacy pass, the target optimization and a
//! thumbnail, then the main asset is stored and a photo record created. A
//! failing file is recorded as `"<file name>: <reason>"` and the batch moves
//! on; a failing thumbnail is logged and never fails its file.

use crate::constants::{DEFAULT_BUCKET, DEFAULT_THUMBNAIL_SIZE};
use crate::error::Result;
use crate::persistence::{PhotoMetadata, PhotoRecord, PhotoRepository};
use crate::processing::{
    generate_thumbnail, optimize_image, strip_metadata, OptimizationConfig, OptimizedAsset,
    SourceImage, ThumbnailAsset,
};
use crate::storage::{ObjectOptions, StorageClient};
use crate::utils::{
    calculate_size_reduction, generate_object_stem, image_object_key, thumbnail_object_key,
};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStage {
    Uploading,
    Processing,
    Completed,
    Error,
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UploadStage::Uploading => "uploading",
            UploadStage::Processing => "processing",
            UploadStage::Completed => "completed",
            UploadStage::Error => "error",
        };
        f.write_str(label)
    }
}

/// Snapshot handed to the progress callback at every checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadProgress {
    pub stage: UploadStage,
    /// Percentage in `0..=100`, never decreasing within a batch.
    pub progress: u8,
    pub current_file: Option<String>,
    pub completed: usize,
    pub total: usize,
    pub errors: Vec<String>,
}

impl UploadProgress {
    pub fn new(total: usize) -> Self {
        Self {
            stage: UploadStage::Processing,
            progress: 0,
            current_file: None,
            completed: 0,
            total,
            errors: Vec::new(),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.stage, UploadStage::Completed | UploadStage::Error)
    }
}

/// High-water mark over raw checkpoint percentages.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgressTracker {
    high_water: u8,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a raw percentage and returns the value to report.
    pub fn advance(&mut self, percent: f64) -> u8 {
        let percent = if percent.is_nan() {
            0
        } else {
            percent.clamp(0.0, 100.0).round() as u8
        };
        self.high_water = self.high_water.max(percent);
        self.high_water
    }

    pub fn current(&self) -> u8 {
        self.high_water
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSummary {
    pub success: bool,
    pub uploaded_count: usize,
    pub errors: Vec<String>,
    pub photos: Vec<PhotoRecord>,
}

#[derive(Debug, Clone)]
pub struct UploaderOptions {
    pub bucket: String,
    pub optimization: OptimizationConfig,
    pub thumbnail_size: u32,
}

impl Default for UploaderOptions {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            optimization: OptimizationConfig::default(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
        }
    }
}

struct Reporter<F> {
    state: UploadProgress,
    tracker: ProgressTracker,
    callback: F,
}

impl<F: FnMut(&UploadProgress)> Reporter<F> {
    fn report(&mut self, stage: UploadStage, percent: f64) {
        self.state.stage = stage;
        self.state.progress = self.tracker.advance(percent);
        (self.callback)(&self.state);
    }
}

fn checkpoint(base: f64, span: f64, done: usize, total: usize) -> f64 {
    base + done as f64 / total as f64 * span
}

pub struct Uploader {
    storage: StorageClient,
    repository: Arc<dyn PhotoRepository>,
    options: UploaderOptions,
}

impl Uploader {
    pub fn new(
        storage: StorageClient,
        repository: Arc<dyn PhotoRepository>,
        options: UploaderOptions,
    ) -> Self {
        Self {
            storage,
            repository,
            options,
        }
    }

    pub fn options(&self) -> &UploaderOptions {
        &self.options
    }

    /// Uploads `files` one after another and records each stored photo
    /// against `venue_id`.
    ///
    /// # Arguments
    /// * `files` - Images in the order they should be processed
    /// * `venue_id` - Venue every created record belongs to
    /// * `on_progress` - Called synchronously with a full snapshot at every checkpoint
    ///
    /// # Returns
    /// * `UploadSummary` - `success` is true when at least one file went through
    pub async fn upload_images<F>(
        &self,
        files: &[SourceImage],
        venue_id: Uuid,
        on_progress: F,
    ) -> UploadSummary
    where
        F: FnMut(&UploadProgress),
    {
        let total = files.len();
        let mut reporter = Reporter {
            state: UploadProgress::new(total),
            tracker: ProgressTracker::new(),
            callback: on_progress,
        };
        let mut photos = Vec::new();

        info!("Uploading {} file(s) to venue {}", total, venue_id);
        reporter.report(UploadStage::Processing, 0.0);

        for (index, source) in files.iter().enumerate() {
            reporter.state.current_file = Some(source.name.clone());
            reporter.report(
                UploadStage::Processing,
                checkpoint(0.0, 50.0, index, total),
            );

            match self
                .upload_one(source, venue_id, index, total, &mut reporter)
                .await
            {
                Ok(record) => {
                    photos.push(record);
                    reporter.state.completed += 1;
                    reporter.report(
                        UploadStage::Uploading,
                        checkpoint(50.0, 40.0, index + 1, total),
                    );
                }
                Err(e) => {
                    warn!("Upload of {} failed: {}", source.name, e);
                    reporter
                        .state
                        .errors
                        .push(format!("{}: {}", source.name, e));
                }
            }
        }

        let completed = reporter.state.completed;
        let final_stage = if completed == 0 && !reporter.state.errors.is_empty() {
            UploadStage::Error
        } else {
            UploadStage::Completed
        };
        reporter.state.current_file = None;
        reporter.report(final_stage, 100.0);

        info!(
            "Batch finished: {}/{} uploaded, {} error(s)",
            completed,
            total,
            reporter.state.errors.len()
        );

        UploadSummary {
            success: completed > 0,
            uploaded_count: completed,
            errors: reporter.state.errors,
            photos,
        }
    }

    async fn upload_one<F: FnMut(&UploadProgress)>(
        &self,
        source: &SourceImage,
        venue_id: Uuid,
        index: usize,
        total: usize,
        reporter: &mut Reporter<F>,
    ) -> Result<PhotoRecord> {
        let (optimized, thumbnail) = self.transform(source)?;

        reporter.report(
            UploadStage::Uploading,
            checkpoint(50.0, 40.0, index, total),
        );

        let bucket = &self.options.bucket;
        let stem = generate_object_stem();
        let format = optimized.format;
        let file_size = optimized.size();
        let dimensions = optimized.dimensions;
        let size_reduction = calculate_size_reduction(source.size(), file_size);

        let image_key = image_object_key(&stem, format.extension());
        let image_url = self
            .storage
            .upload_object(
                bucket,
                &image_key,
                optimized.data,
                &ObjectOptions::new(format.mime_type()),
            )
            .await?;

        let thumbnail_url = match thumbnail {
            Some(thumb) => self.store_thumbnail(&stem, thumb).await,
            None => None,
        };

        let metadata = PhotoMetadata {
            thumbnail_url,
            original_file_name: source.name.clone(),
            file_size,
            dimensions,
            size_reduction,
            uploaded_at: Utc::now(),
        };

        let record = self
            .repository
            .create_photo(&image_url, venue_id, metadata)
            .await?;
        debug!("Recorded photo {} for {}", record.id, source.name);

        Ok(record)
    }

    /// Privacy pass, target optimization and thumbnail. Only the first two
    /// can fail the file.
    fn transform(&self, source: &SourceImage) -> Result<(OptimizedAsset, Option<ThumbnailAsset>)> {
        let scrubbed = strip_metadata(source)?.into_source(source.name.clone());
        let optimized = optimize_image(&scrubbed, &self.options.optimization)?;

        let thumbnail = match generate_thumbnail(&optimized.data, self.options.thumbnail_size) {
            Ok(thumb) => Some(thumb),
            Err(e) => {
                warn!("Thumbnail generation failed for {}: {}", source.name, e);
                None
            }
        };

        Ok((optimized, thumbnail))
    }

    async fn store_thumbnail(&self, stem: &str, thumbnail: ThumbnailAsset) -> Option<String> {
        let format = ThumbnailAsset::FORMAT;
        let key = thumbnail_object_key(stem, format.extension());

        match self
            .storage
            .upload_object(
                &self.options.bucket,
                &key,
                thumbnail.data,
                &ObjectOptions::new(format.mime_type()),
            )
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Thumbnail upload failed for {}: {}", key, e);
                None
            }
        }
    }
}
