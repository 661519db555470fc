//! In-process object store used for dry runs.

use crate::error::{PipelineError, Result};
use crate::storage::{BucketConfig, ObjectOptions, ObjectStore};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub data: Vec<u8>,
    pub content_type: String,
    pub cache_control_secs: u32,
}

#[derive(Debug, Default)]
struct Bucket {
    config: BucketConfig,
    objects: BTreeMap<String, StoredObject>,
}

/// Mirrors the hosted store's rules: no overwrites unless `upsert`, bucket
/// media-type and size limits enforced.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that already holds `name` with default bucket settings.
    pub fn with_bucket(name: &str) -> Self {
        let store = Self::new();
        store.lock().insert(
            name.to_string(),
            Bucket {
                config: BucketConfig::default(),
                objects: BTreeMap::new(),
            },
        );
        store
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn bucket_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.lock()
            .get(bucket)
            .and_then(|b| b.objects.get(key))
            .cloned()
    }

    pub fn object_keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .get(bucket)
            .map(|b| b.objects.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        Ok(self.bucket_names())
    }

    async fn create_bucket(&self, name: &str, config: &BucketConfig) -> Result<()> {
        self.lock().entry(name.to_string()).or_insert_with(|| Bucket {
            config: config.clone(),
            objects: BTreeMap::new(),
        });
        Ok(())
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &ObjectOptions,
    ) -> Result<()> {
        let mut buckets = self.lock();
        let target = buckets
            .get_mut(bucket)
            .ok_or_else(|| PipelineError::Upload(format!("Bucket not found: {}", bucket)))?;

        if !target
            .config
            .allowed_media_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&options.content_type))
        {
            return Err(PipelineError::Upload(format!(
                "Media type {} is not allowed in bucket {}",
                options.content_type, bucket
            )));
        }
        if data.len() as u64 > target.config.max_object_size {
            return Err(PipelineError::Upload(format!(
                "Object exceeds the bucket size limit of {} bytes",
                target.config.max_object_size
            )));
        }
        if !options.upsert && target.objects.contains_key(key) {
            return Err(PipelineError::Upload(format!(
                "Object already exists: {}",
                key
            )));
        }

        target.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: options.content_type.clone(),
                cache_control_secs: options.cache_control_secs,
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://{}/{}", bucket, key)
    }
}
