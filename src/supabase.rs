use crate::constants::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::error::{PipelineError, Result};
use crate::storage::{BucketConfig, ObjectOptions, ObjectStore};
use crate::utils::join_url;
use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const STORAGE_API: &str = "storage/v1";

#[derive(Debug, Clone)]
pub struct SupabaseOptions {
    pub url: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

impl SupabaseOptions {
    pub fn new(url: String, api_key: String, request_timeout: Option<Duration>) -> Self {
        Self {
            url,
            api_key,
            request_timeout: request_timeout
                .unwrap_or_else(|| Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BucketEntry {
    name: String,
}

#[derive(Debug, Serialize)]
struct CreateBucketRequest<'a> {
    id: &'a str,
    name: &'a str,
    public: bool,
    allowed_mime_types: &'a [String],
    file_size_limit: u64,
}

/// Object store backed by the Supabase storage REST API.
pub struct SupabaseStorage {
    client: Client,
    options: SupabaseOptions,
}

impl SupabaseStorage {
    pub fn new(options: SupabaseOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| PipelineError::Upload(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, options })
    }

    fn endpoint(&self, segments: &[&str]) -> String {
        let mut all = vec![STORAGE_API];
        all.extend_from_slice(segments);
        join_url(&self.options.url, &all)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.options.api_key)
            .header("apikey", &self.options.api_key)
    }
}

fn request_error(e: reqwest::Error) -> PipelineError {
    PipelineError::Upload(format!("Storage request failed: {}", e))
}

async fn error_body(response: Response) -> (StatusCode, String) {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    (status, body)
}

fn is_duplicate(status: StatusCode, body: &str) -> bool {
    status == StatusCode::CONFLICT || body.contains("already exists") || body.contains("Duplicate")
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn list_buckets(&self) -> Result<Vec<String>> {
        let response = self
            .authorized(self.client.get(self.endpoint(&["bucket"])))
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            return Err(PipelineError::Upload(format!(
                "Listing buckets failed ({}): {}",
                status, body
            )));
        }

        let buckets: Vec<BucketEntry> = response.json().await.map_err(request_error)?;
        Ok(buckets.into_iter().map(|b| b.name).collect())
    }

    async fn create_bucket(&self, name: &str, config: &BucketConfig) -> Result<()> {
        let payload = CreateBucketRequest {
            id: name,
            name,
            public: config.public,
            allowed_mime_types: &config.allowed_media_types,
            file_size_limit: config.max_object_size,
        };

        let response = self
            .authorized(self.client.post(self.endpoint(&["bucket"])))
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;

        if response.status().is_success() {
            return Ok(());
        }

        let (status, body) = error_body(response).await;
        if is_duplicate(status, &body) {
            debug!("Bucket {} already exists", name);
            return Ok(());
        }

        Err(PipelineError::Upload(format!(
            "Creating bucket {} failed ({}): {}",
            name, status, body
        )))
    }

    async fn upload_object(
        &self,
        bucket: &str,
        key: &str,
        data: Vec<u8>,
        options: &ObjectOptions,
    ) -> Result<()> {
        let response = self
            .authorized(self.client.post(self.endpoint(&["object", bucket, key])))
            .header(CONTENT_TYPE, &options.content_type)
            .header(
                CACHE_CONTROL,
                format!("max-age={}", options.cache_control_secs),
            )
            .header("x-upsert", options.upsert.to_string())
            .body(data)
            .send()
            .await
            .map_err(request_error)?;

        if !response.status().is_success() {
            let (status, body) = error_body(response).await;
            return Err(PipelineError::Upload(format!(
                "Uploading {}/{} failed ({}): {}",
                bucket, key, status, body
            )));
        }

        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        self.endpoint(&["object", "public", bucket, key])
    }
}
