//! Leonardo REST API client

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::provider::traits::{
    GenerationJob, GenerationProvider, GenerationStatus, ImageDescriptor, JobStatus, Submission,
};
use crate::transport::RetryingClient;

/// Deliberate 1.1
pub const MODEL_ID: &str = "458ecfff-f76c-402c-8b85-f09f6fb198de";

/// Leonardo generation provider
pub struct LeonardoProvider {
    http: RetryingClient,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ApiGenerationRequest<'a> {
    prompt: &'a str,
    negative_prompt: &'a str,
    height: u32,
    width: u32,
    num_images: u32,
    #[serde(rename = "modelId")]
    model_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiSubmitResponse {
    #[serde(rename = "sdGenerationJob", default)]
    sd_generation_job: Option<ApiGenerationJob>,
}

#[derive(Debug, Deserialize)]
struct ApiGenerationJob {
    #[serde(rename = "generationId", default)]
    generation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiStatusResponse {
    #[serde(default)]
    generations_by_pk: Option<ApiGeneration>,
}

#[derive(Debug, Deserialize)]
struct ApiGeneration {
    #[serde(default)]
    status: Option<JobStatus>,
    #[serde(default)]
    generated_images: Option<Vec<ApiGeneratedImage>>,
}

#[derive(Debug, Deserialize)]
struct ApiGeneratedImage {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    nsfw: Option<bool>,
}

impl LeonardoProvider {
    pub fn new(http: RetryingClient, config: &ProviderConfig) -> Self {
        Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn generations_url(&self) -> String {
        format!("{}/generations", self.base_url)
    }
}

#[async_trait]
impl GenerationProvider for LeonardoProvider {
    fn name(&self) -> &str {
        "leonardo"
    }

    async fn submit(&self, submission: &Submission) -> Result<Option<GenerationJob>> {
        let body = ApiGenerationRequest {
            prompt: &submission.prompt,
            negative_prompt: &submission.negative_prompt,
            height: submission.height,
            width: submission.width,
            num_images: submission.num_images,
            model_id: MODEL_ID,
        };

        debug!(
            width = body.width,
            height = body.height,
            model = MODEL_ID,
            "Submitting generation"
        );

        let request = self
            .http
            .inner()
            .post(self.generations_url())
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json")
            .json(&body);

        let response = self.http.execute(request).await?.error_for_status()?;
        let parsed: ApiSubmitResponse = response.json().await?;

        Ok(parsed
            .sd_generation_job
            .and_then(|job| job.generation_id)
            .filter(|id| !id.is_empty())
            .map(|id| GenerationJob { id }))
    }

    async fn poll_status(&self, job: &GenerationJob) -> Result<GenerationStatus> {
        let url = format!("{}/{}", self.generations_url(), job.id);
        let request = self
            .http
            .inner()
            .get(url)
            .bearer_auth(&self.api_key)
            .header(ACCEPT, "application/json");

        let response = self.http.execute(request).await?.error_for_status()?;
        let parsed: ApiStatusResponse = response.json().await?;

        let Some(generation) = parsed.generations_by_pk else {
            return Ok(GenerationStatus::pending());
        };

        Ok(GenerationStatus {
            status: generation.status.unwrap_or(JobStatus::Pending),
            images: generation
                .generated_images
                .unwrap_or_default()
                .into_iter()
                .map(|image| ImageDescriptor {
                    id: image.id,
                    url: image.url,
                    nsfw: image.nsfw.unwrap_or(false),
                })
                .collect(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let request = self.http.inner().get(url);
        let response = self.http.execute(request).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        debug!(size = bytes.len(), "Fetched generated image");

        Ok(bytes.to_vec())
    }
}
