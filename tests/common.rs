#![allow(dead_code)]

use async_trait::async_trait;
use guest_photos::{
    BucketConfig, JsonCatalog, MemoryStore, NewParticipant, NewVenue, ObjectOptions, ObjectStore,
    Participant, ParticipantEntry, PhotoMetadata, PhotoPage, PhotoQuery, PhotoRecord,
    PhotoRepository, PipelineError, Result, SourceImage, StorageClient, Uploader, UploaderOptions,
    Venue,
};
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub const BUCKET: &str = "guest-photos";

pub fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 3 % 256) as u8, ((x + y) % 256) as u8])
    });
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), format)
        .unwrap();
    buffer
}

pub fn jpeg_source(name: &str, width: u32, height: u32) -> SourceImage {
    SourceImage::new(name, "image/jpeg", encode(width, height, ImageFormat::Jpeg))
}

pub fn corrupt_source(name: &str) -> SourceImage {
    SourceImage::new(name, "image/jpeg", b"this is not a jpeg".to_vec())
}

pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, encode(width, height, ImageFormat::Png)).unwrap();
    path
}

pub fn write_jpeg(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, encode(width, height, ImageFormat::Jpeg)).unwrap();
    path
}

/// Memory store that rejects uploads whose key starts with `fail_prefix`.
pub struct FlakyStore {
    pub inner: MemoryStore,
    pub fail_prefix: Option<&'static str>,
    pub uploads: AtomicUsize,
}

impl FlakyStore {
    pub fn new(fail_prefix: Option<&'static str>) -> Self {
        Self {
            inner: MemoryStore::with_bucket(BUCKET),
            fail_prefix,
            uploads: AtomicUsize::new(0),
        }
    }

    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.inner
            .object_keys(BUCKET)
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect()
    }
}

#[async_trait]
impl ObjectStore for FlakyStore {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        self.inner.list_buckets().await
    }

    async fn create_bucket(&self, name: &str, config: &BucketConfig) -> Result<()> {
        self.inner.create_bucket(name, config).await
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &ObjectOptions,
    ) -> Result<()> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        if let Some(prefix) = self.fail_prefix {
            if key.starts_with(prefix) {
                return Err(PipelineError::Upload(format!("simulated outage for {}", key)));
            }
        }
        self.inner.upload_object(bucket, key, data, options).await
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.inner.public_url(bucket, key)
    }
}

/// Repository whose record creation always fails.
pub struct BrokenRepository {
    pub attempts: AtomicUsize,
}

impl BrokenRepository {
    pub fn new() -> Self {
        Self {
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PhotoRepository for BrokenRepository {
    async fn list_venues(&self) -> Result<Vec<Venue>> {
        Ok(Vec::new())
    }

    async fn create_venue(&self, _venue: NewVenue) -> Result<Venue> {
        Err(PipelineError::Persistence("read-only".to_string()))
    }

    async fn create_photo(
        &self,
        _image_url: &str,
        _venue_id: Uuid,
        _metadata: PhotoMetadata,
    ) -> Result<PhotoRecord> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PipelineError::Persistence("database offline".to_string()))
    }

    async fn get_photo(&self, _id: Uuid) -> Result<Option<PhotoRecord>> {
        Ok(None)
    }

    async fn list_photos(&self, _query: &PhotoQuery) -> Result<PhotoPage> {
        Ok(PhotoPage {
            photos: Vec::new(),
            has_more: false,
            next_page: None,
        })
    }

    async fn set_approval(&self, id: Uuid, _approved: bool) -> Result<PhotoRecord> {
        Err(PipelineError::PhotoNotFound(id.to_string()))
    }

    async fn delete_photo(&self, _id: Uuid) -> Result<bool> {
        Ok(false)
    }

    async fn list_participants(&self, _search: Option<&str>) -> Result<Vec<ParticipantEntry>> {
        Ok(Vec::new())
    }

    async fn create_participant(&self, _participant: NewParticipant) -> Result<Participant> {
        Err(PipelineError::Persistence("read-only".to_string()))
    }
}

pub async fn catalog_with_venue() -> (Arc<JsonCatalog>, Uuid) {
    let catalog = Arc::new(JsonCatalog::in_memory());
    let venue = catalog
        .create_venue(NewVenue {
            name: "Corner Cafe".to_string(),
            address: "2 High St".to_string(),
            value: Some(1),
        })
        .await
        .unwrap();
    (catalog, venue.id)
}

pub fn uploader(store: Arc<dyn ObjectStore>, repo: Arc<dyn PhotoRepository>) -> Uploader {
    let options = UploaderOptions {
        bucket: BUCKET.to_string(),
        thumbnail_size: 32,
        ..Default::default()
    };
    Uploader::new(StorageClient::new(store), repo, options)
}
