//! Application configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file, then
//! environment variables (a `.env` file is honored), then CLI flags applied
//! by the binary. `validate()` runs once everything is merged.

use crate::constants::{
    BUCKET_ENV, CATALOG_ENV, DEFAULT_BUCKET, DEFAULT_CATALOG_PATH, DEFAULT_MAX_BATCH_FILES,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STARTUP_TIMEOUT_SECS, DEFAULT_THUMBNAIL_SIZE,
    SUPABASE_KEY_ENV, SUPABASE_URL_ENV,
};
use crate::error::{PipelineError, Result};
use crate::processing::OptimizationConfig;
use crate::storage::BucketConfig;
use crate::supabase::SupabaseOptions;
use crate::upload::UploaderOptions;
use crate::validation::ValidationOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the Supabase project
    pub supabase_url: Option<String>,
    /// Service key used for storage requests
    pub supabase_key: Option<String>,
    pub bucket: String,
    /// JSON file holding venues and photo records
    pub catalog_path: PathBuf,
    pub optimization: OptimizationConfig,
    pub thumbnail_size: u32,
    pub validation: ValidationOptions,
    pub max_batch_files: usize,
    pub startup_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_key: None,
            bucket: DEFAULT_BUCKET.to_string(),
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            optimization: OptimizationConfig::default(),
            thumbnail_size: DEFAULT_THUMBNAIL_SIZE,
            validation: ValidationOptions::default(),
            max_batch_files: DEFAULT_MAX_BATCH_FILES,
            startup_timeout_secs: DEFAULT_STARTUP_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Defaults, the optional file at `path`, then the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenv::dotenv().ok();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Overrides fields from environment-style lookups; empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(SUPABASE_URL_ENV) {
            self.supabase_url = Some(url);
        }
        if let Some(key) = get(SUPABASE_KEY_ENV) {
            self.supabase_key = Some(key);
        }
        if let Some(bucket) = get(BUCKET_ENV) {
            self.bucket = bucket;
        }
        if let Some(catalog) = get(CATALOG_ENV) {
            self.catalog_path = PathBuf::from(catalog);
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.optimization.validate()?;

        if self.bucket.trim().is_empty() {
            return Err(PipelineError::Config("Bucket name must not be empty".into()));
        }
        if self.thumbnail_size == 0 {
            return Err(PipelineError::Config(
                "Thumbnail size must be greater than 0".into(),
            ));
        }
        if self.max_batch_files == 0 {
            return Err(PipelineError::Config(
                "Batch file limit must be greater than 0".into(),
            ));
        }
        if self.validation.max_size == 0 {
            return Err(PipelineError::Config(
                "Maximum file size must be greater than 0".into(),
            ));
        }
        if self.validation.allowed_types.is_empty() {
            return Err(PipelineError::Config(
                "At least one media type must be allowed".into(),
            ));
        }
        if self.startup_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(PipelineError::Config("Timeouts must be greater than 0".into()));
        }
        if let Some(url) = &self.supabase_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(PipelineError::Config(format!(
                    "Supabase URL must start with http:// or https://: {}",
                    url
                )));
            }
        }

        Ok(())
    }

    /// Remote storage settings, when both URL and key are configured.
    pub fn supabase_options(&self) -> Option<SupabaseOptions> {
        match (&self.supabase_url, &self.supabase_key) {
            (Some(url), Some(key)) => Some(SupabaseOptions::new(
                url.clone(),
                key.clone(),
                Some(Duration::from_secs(self.request_timeout_secs)),
            )),
            _ => None,
        }
    }

    pub fn bucket_config(&self) -> BucketConfig {
        BucketConfig {
            public: true,
            allowed_media_types: self.validation.allowed_types.clone(),
            max_object_size: self.validation.max_size,
        }
    }

    pub fn uploader_options(&self) -> UploaderOptions {
        UploaderOptions {
            bucket: self.bucket.clone(),
            optimization: self.optimization,
            thumbnail_size: self.thumbnail_size,
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}
