//! Shared outbound HTTP transport with idempotent-failure retries

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::TransportConfig;
use crate::error::{AppError, Result};

/// Upper bound on a single backoff sleep
const BACKOFF_MAX: Duration = Duration::from_secs(120);

/// Retry policy applied to every outbound call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Number of retries after the first attempt
    pub max_retries: u32,
    /// Backoff factor in seconds; retry `n > 1` sleeps `factor * 2^(n-1)`
    pub backoff_factor: f64,
    /// Response statuses that trigger a retry
    pub retry_statuses: Vec<StatusCode>,
}

impl RetryPolicy {
    pub fn from_config(config: &TransportConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: config.backoff_factor,
            retry_statuses: config
                .retry_statuses
                .iter()
                .filter_map(|code| StatusCode::from_u16(*code).ok())
                .collect(),
        }
    }

    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff_factor: 0.0,
            retry_statuses: Vec::new(),
        }
    }

    /// Sleep before the given retry (1-based). The first retry goes out at once.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let exponent = (retry - 1).min(31) as i32;
        let secs = self.backoff_factor * 2f64.powi(exponent);
        Duration::from_secs_f64(secs.min(BACKOFF_MAX.as_secs_f64()))
    }

    fn should_retry_status(&self, status: StatusCode) -> bool {
        self.retry_statuses.contains(&status)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

/// HTTP client shared by every outbound integration
#[derive(Clone)]
pub struct RetryingClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingClient {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Build the process-wide client from configuration
    pub fn from_config(config: &TransportConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::new(client, RetryPolicy::from_config(config)))
    }

    /// Underlying reqwest client, used to start request builders
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Send a request, retrying retryable statuses and connection failures.
    ///
    /// Connect failures are retried for every method. Retryable statuses and
    /// timeouts are retried only for idempotent methods, since the upstream
    /// may already have acted on the request. The final response is returned
    /// as-is; callers decide how to treat its status. Requests whose body
    /// cannot be cloned are sent exactly once.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let request = request.build()?;
        let idempotent = is_idempotent(request.method());
        let mut retry = 0;

        loop {
            let attempt = match request.try_clone() {
                Some(attempt) if retry < self.policy.max_retries => attempt,
                _ => return Ok(self.client.execute(request).await?),
            };

            match self.client.execute(attempt).await {
                Ok(response)
                    if idempotent && self.policy.should_retry_status(response.status()) =>
                {
                    warn!(
                        status = %response.status(),
                        url = %response.url(),
                        retry = retry + 1,
                        "Retryable status from upstream"
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if e.is_connect() || (idempotent && e.is_timeout()) => {
                    warn!(error = %e, retry = retry + 1, "Connection failure, retrying");
                }
                Err(e) => return Err(AppError::HttpClient(e)),
            }

            retry += 1;
            let delay = self.policy.backoff(retry);
            debug!(delay_ms = delay.as_millis() as u64, retry, "Backing off");
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::PUT | Method::DELETE | Method::OPTIONS | Method::TRACE
    )
}
