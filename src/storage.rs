//! Object storage primitives and the tolerant client the pipeline talks to.

use crate::constants::{CACHE_CONTROL_SECONDS, DEFAULT_ALLOWED_MEDIA_TYPES, DEFAULT_MAX_FILE_SIZE};
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    pub public: bool,
    pub allowed_media_types: Vec<String>,
    pub max_object_size: u64,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            public: true,
            allowed_media_types: DEFAULT_ALLOWED_MEDIA_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            max_object_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectOptions {
    pub content_type: String,
    pub cache_control_secs: u32,
    /// Overwrite an existing object at the same key.
    pub upsert: bool,
}

impl ObjectOptions {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            cache_control_secs: CACHE_CONTROL_SECONDS,
            upsert: false,
        }
    }
}

/// Raw object-store operations. Adapters report failures as
/// `PipelineError::Upload`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<String>>;

    async fn create_bucket(&self, name: &str, config: &BucketConfig) -> Result<()>;

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &ObjectOptions,
    ) -> Result<()>;

    /// Stable public URL of an object. Assumed valid once the upload succeeded.
    fn public_url(&self, bucket: &str, key: &str) -> String;
}

#[derive(Clone)]
pub struct StorageClient {
    store: Arc<dyn ObjectStore>,
}

impl StorageClient {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// `None` means the bucket list could not be read, so existence is unknown.
    pub async fn bucket_exists(&self, name: &str) -> Option<bool> {
        match self.store.list_buckets().await {
            Ok(buckets) => Some(buckets.iter().any(|bucket| bucket == name)),
            Err(e) => {
                warn!("Could not list buckets: {}", e);
                None
            }
        }
    }

    /// Returns whether the bucket was created. Failures are only logged.
    pub async fn create_bucket(&self, name: &str, config: &BucketConfig) -> bool {
        match self.store.create_bucket(name, config).await {
            Ok(()) => {
                info!("Created storage bucket {}", name);
                true
            }
            Err(e) => {
                error!("Failed to create storage bucket {}: {}", name, e);
                false
            }
        }
    }

    /// Best-effort provisioning; safe to call any number of times.
    pub async fn ensure_bucket(&self, name: &str, config: &BucketConfig) {
        match self.bucket_exists(name).await {
            Some(true) => debug!("Storage bucket {} already exists", name),
            Some(false) => {
                self.create_bucket(name, config).await;
            }
            None => warn!("Skipping provisioning of bucket {}", name),
        }
    }

    /// Uploads an object and resolves its public URL.
    pub async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &ObjectOptions,
    ) -> Result<String> {
        let size = data.len();
        self.store.upload_object(bucket, key, data, options).await?;
        debug!("Stored {}/{} ({} bytes)", bucket, key, size);
        Ok(self.public_url(bucket, key))
    }

    pub fn public_url(&self, bucket: &str, key: &str) -> String {
        self.store.public_url(bucket, key)
    }
}
