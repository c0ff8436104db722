//! Generation orchestrator: submit, poll, fetch, and republish
//!
//! Every external failure is logged where it happens and turned into `None`.
//! Only [`Orchestrator::generate`] turns an absent result into an error, one
//! per stage.

pub mod delay;
pub mod prompt;

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::PollingConfig;
use crate::error::{AppError, Result};
use crate::provider::{
    GenerationJob, GenerationProvider, GenerationRequest, GenerationResult, JobStatus,
};
use crate::storage::{object_key, object_name, ObjectStore, UploadedArtifact, IMAGE_CONTENT_TYPE};

pub use delay::{Delay, TokioDelay};

/// Polling and publishing parameters
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub max_attempts: u32,
    pub poll_interval: Duration,
    /// Prefix prepended verbatim to every object name
    pub folder: String,
}

impl OrchestratorConfig {
    pub fn new(polling: &PollingConfig, folder: impl Into<String>) -> Self {
        Self {
            max_attempts: polling.max_attempts,
            poll_interval: polling.interval(),
            folder: folder.into(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new(&PollingConfig::default(), "")
    }
}

/// Outcome of a single status check
enum PollOutcome {
    /// Keep polling
    NotReady,
    /// Stop polling; nothing usable will come of this job
    Abort,
    Ready(GenerationResult),
}

/// Long-lived service that runs the generation workflow for each request
pub struct Orchestrator {
    provider: Arc<dyn GenerationProvider>,
    store: Arc<dyn ObjectStore>,
    delay: Arc<dyn Delay>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn GenerationProvider>,
        store: Arc<dyn ObjectStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            provider,
            store,
            delay: Arc::new(TokioDelay),
            config,
        }
    }

    /// Replace the inter-poll wait
    pub fn with_delay(mut self, delay: Arc<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    /// Run the whole workflow for one request.
    ///
    /// A missing generation result maps to `UpstreamGeneration`, a failed
    /// upload to `UpstreamUpload`. Nothing is resumable: a failure at any
    /// stage discards the job.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<UploadedArtifact> {
        let result = self.create(request).await.ok_or_else(|| {
            AppError::UpstreamGeneration("generation yielded no result".to_string())
        })?;

        self.publish(result)
            .await
            .ok_or_else(|| AppError::UpstreamUpload("upload yielded no URL".to_string()))
    }

    /// Submit the request and wait for a safe, downloadable image
    pub async fn create(&self, request: &GenerationRequest) -> Option<GenerationResult> {
        let submission = prompt::submission_for(request);

        let job = match self.provider.submit(&submission).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(provider = %self.provider.name(), "No generation ID received");
                return None;
            }
            Err(e) => {
                error!(provider = %self.provider.name(), error = %e, "Generation submit failed");
                return None;
            }
        };

        info!(
            provider = %self.provider.name(),
            job_id = %job.id,
            width = submission.width,
            height = submission.height,
            "Generation submitted"
        );

        self.poll(job).await
    }

    /// Poll a job until it completes, aborts, or runs out of attempts.
    ///
    /// Takes the job by value: a job id feeds exactly one polling sequence.
    pub async fn poll(&self, job: GenerationJob) -> Option<GenerationResult> {
        for attempt in 1..=self.config.max_attempts {
            self.delay.sleep(self.config.poll_interval).await;

            match self.check(&job, attempt).await {
                PollOutcome::NotReady => continue,
                PollOutcome::Abort => return None,
                PollOutcome::Ready(result) => return Some(result),
            }
        }

        error!(
            job_id = %job.id,
            attempts = self.config.max_attempts,
            "Maximum generation attempts reached"
        );
        None
    }

    async fn check(&self, job: &GenerationJob, attempt: u32) -> PollOutcome {
        let status = match self.provider.poll_status(job).await {
            Ok(status) => status,
            Err(e) => {
                error!(job_id = %job.id, attempt, error = %e, "Status polling error");
                return PollOutcome::NotReady;
            }
        };

        if !status.is_complete() {
            if status.status == JobStatus::Failed {
                warn!(job_id = %job.id, attempt, "Provider reports generation failed");
            } else {
                debug!(job_id = %job.id, attempt, status = ?status.status, "Generation not ready");
            }
            return PollOutcome::NotReady;
        }

        // Only the first descriptor is considered.
        let Some(image) = status.images.into_iter().next() else {
            warn!(job_id = %job.id, "Completed generation has no images");
            return PollOutcome::Abort;
        };

        if image.nsfw {
            warn!(job_id = %job.id, image_id = ?image.id, "Generated image is NSFW");
            return PollOutcome::Abort;
        }

        let Some(url) = image.url.filter(|u| !u.is_empty()) else {
            warn!(job_id = %job.id, "No image URL found");
            return PollOutcome::Abort;
        };

        match self.provider.fetch(&url).await {
            Ok(bytes) => {
                info!(job_id = %job.id, attempt, size = bytes.len(), "Generation complete");
                PollOutcome::Ready(GenerationResult::completed(url, bytes))
            }
            Err(e) => {
                error!(job_id = %job.id, attempt, error = %e, "Image download failed");
                PollOutcome::NotReady
            }
        }
    }

    /// Upload the result's bytes and return their public address
    pub async fn publish(&self, result: GenerationResult) -> Option<UploadedArtifact> {
        if result.image_bytes().is_empty() {
            error!(source_url = %result.image_url(), "No image bytes found");
            return None;
        }

        let key = object_key(&self.config.folder, &object_name());

        match self
            .store
            .upload(result.into_bytes(), &key, IMAGE_CONTENT_TYPE)
            .await
        {
            Ok(public_url) => Some(UploadedArtifact { public_url }),
            Err(e) => {
                error!(store = %self.store.name(), object = %key, error = %e, "Upload failed");
                None
            }
        }
    }
}
