//! Google Cloud Storage JSON API store

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Response, Url};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{AppError, Result};
use crate::storage::auth::TokenSource;
use crate::storage::traits::ObjectStore;
use crate::transport::RetryingClient;

/// Object store backed by a GCS bucket
pub struct GcsStore {
    http: RetryingClient,
    tokens: Arc<dyn TokenSource>,
    bucket: String,
    api_base: Url,
    public_base: Url,
}

impl GcsStore {
    pub fn new(
        http: RetryingClient,
        tokens: Arc<dyn TokenSource>,
        config: &StorageConfig,
    ) -> Result<Self> {
        Ok(Self {
            http,
            tokens,
            bucket: config.bucket.clone(),
            api_base: parse_base(&config.api_base)?,
            public_base: parse_base(&config.public_base)?,
        })
    }

    /// Address under which a publicly readable object resolves
    pub fn public_url(&self, key: &str) -> Result<String> {
        let mut url = self.public_base.clone();
        extend_path(&mut url, std::iter::once(self.bucket.as_str()).chain(key.split('/')))?;
        Ok(url.to_string())
    }

    fn upload_url(&self) -> Result<Url> {
        let mut url = self.api_base.clone();
        extend_path(
            &mut url,
            ["upload", "storage", "v1", "b", self.bucket.as_str(), "o"],
        )?;
        Ok(url)
    }

    /// The object name is a single segment here, so `/` inside it gets encoded
    fn acl_url(&self, key: &str) -> Result<Url> {
        let mut url = self.api_base.clone();
        extend_path(
            &mut url,
            ["storage", "v1", "b", self.bucket.as_str(), "o", key, "acl"],
        )?;
        Ok(url)
    }

    async fn write_object(
        &self,
        token: &str,
        bytes: Vec<u8>,
        key: &str,
        content_type: &str,
    ) -> Result<()> {
        let request = self
            .http
            .inner()
            .post(self.upload_url()?)
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(token)
            .header(CONTENT_TYPE, content_type)
            .body(bytes);

        let response = self.http.execute(request).await?;
        ensure_success(response, "upload").await?;
        debug!(bucket = %self.bucket, object = %key, "Object written");
        Ok(())
    }

    async fn make_public(&self, token: &str, key: &str) -> Result<()> {
        let request = self
            .http
            .inner()
            .post(self.acl_url(key)?)
            .bearer_auth(token)
            .json(&json!({ "entity": "allUsers", "role": "READER" }));

        let response = self.http.execute(request).await?;
        ensure_success(response, "acl").await?;
        debug!(bucket = %self.bucket, object = %key, "Object made public");
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    fn name(&self) -> &str {
        "gcs"
    }

    async fn upload(&self, bytes: Vec<u8>, key: &str, content_type: &str) -> Result<String> {
        let token = self.tokens.token().await?;
        let size = bytes.len();

        self.write_object(&token, bytes, key, content_type).await?;
        self.make_public(&token, key).await?;

        let public_url = self.public_url(key)?;
        info!(bucket = %self.bucket, object = %key, size, "Uploaded object");
        Ok(public_url)
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| AppError::Internal(format!("Invalid storage base URL '{}': {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(AppError::Internal(format!(
            "Storage base URL '{}' cannot carry a path",
            raw
        )));
    }
    Ok(url)
}

fn extend_path<'a>(url: &mut Url, segments: impl IntoIterator<Item = &'a str>) -> Result<()> {
    url.path_segments_mut()
        .map_err(|_| AppError::Internal("Storage URL cannot carry a path".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(())
}

async fn ensure_success(response: Response, step: &str) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(AppError::UpstreamUpload(format!(
        "Storage {} returned {}: {}",
        step, status, body
    )))
}
