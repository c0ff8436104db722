//! Common traits and types for generation providers

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Largest width the provider accepts
pub const MAX_WIDTH: u32 = 900;
/// Largest height the provider accepts
pub const MAX_HEIGHT: u32 = 1536;
/// Width used when the caller does not give one
pub const DEFAULT_WIDTH: u32 = 896;
/// Height used when the caller does not give one
pub const DEFAULT_HEIGHT: u32 = 1192;

/// A request to generate a single image.
///
/// Dimensions are clamped to the provider maxima on construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    width: u32,
    height: u32,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            prompt: prompt.into(),
            width: width.min(MAX_WIDTH),
            height: height.min(MAX_HEIGHT),
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Payload actually sent to the provider, after prompt augmentation
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub prompt: String,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_images: u32,
}

/// Handle to a submitted generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub id: String,
}

/// Provider-side job status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum JobStatus {
    Pending,
    Complete,
    Failed,
    Other(String),
}

impl From<String> for JobStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PENDING" => Self::Pending,
            "COMPLETE" => Self::Complete,
            "FAILED" => Self::Failed,
            _ => Self::Other(value),
        }
    }
}

impl From<JobStatus> for String {
    fn from(value: JobStatus) -> Self {
        match value {
            JobStatus::Pending => "PENDING".to_string(),
            JobStatus::Complete => "COMPLETE".to_string(),
            JobStatus::Failed => "FAILED".to_string(),
            JobStatus::Other(s) => s,
        }
    }
}

/// One generated image as described by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageDescriptor {
    pub id: Option<String>,
    pub url: Option<String>,
    pub nsfw: bool,
}

/// Snapshot returned by a status query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationStatus {
    pub status: JobStatus,
    pub images: Vec<ImageDescriptor>,
}

impl GenerationStatus {
    pub fn pending() -> Self {
        Self {
            status: JobStatus::Pending,
            images: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Complete
    }
}

/// A completed, safe generation with its image bytes attached
#[derive(Debug, Clone)]
pub struct GenerationResult {
    status: JobStatus,
    nsfw: bool,
    image_url: String,
    image_bytes: Vec<u8>,
}

impl GenerationResult {
    /// Only completed, unflagged images carry bytes, so this is the sole constructor.
    pub fn completed(image_url: String, image_bytes: Vec<u8>) -> Self {
        Self {
            status: JobStatus::Complete,
            nsfw: false,
            image_url,
            image_bytes,
        }
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn nsfw(&self) -> bool {
        self.nsfw
    }

    /// Provider-hosted URL the bytes were fetched from
    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn image_bytes(&self) -> &[u8] {
        &self.image_bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.image_bytes
    }
}

/// Capabilities the orchestrator needs from a generation provider
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Submit a generation. `Ok(None)` means the provider answered without a job id.
    async fn submit(&self, submission: &Submission) -> Result<Option<GenerationJob>>;

    /// Query the status of a submitted job
    async fn poll_status(&self, job: &GenerationJob) -> Result<GenerationStatus>;

    /// Download a generated image
    async fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}
