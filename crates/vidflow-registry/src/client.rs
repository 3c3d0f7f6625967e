//! Registry HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use vidflow_models::JobOutcome;

use crate::error::{RegistryError, RegistryResult};

/// Configuration for the registry client.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Base URL of the registry service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Max retries for retryable failures
    pub max_retries: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: "http://registry:8080".to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }
}

impl RegistryConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("REGISTRY_URL")
                .unwrap_or_else(|_| "http://registry:8080".to_string()),
            timeout: Duration::from_secs(
                std::env::var("REGISTRY_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_retries: std::env::var("REGISTRY_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
        }
    }
}

/// Port for reporting finished jobs upstream.
#[async_trait]
pub trait RegistryNotifier: Send + Sync {
    /// Report a job's variant results to the registry.
    async fn report_ready(&self, outcome: &JobOutcome) -> RegistryResult<()>;
}

/// HTTP client for the registry service.
pub struct RegistryClient {
    http: Client,
    config: RegistryConfig,
}

impl RegistryClient {
    /// Create a new registry client.
    pub fn new(config: RegistryConfig) -> RegistryResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RegistryError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> RegistryResult<Self> {
        Self::new(RegistryConfig::from_env())
    }

    async fn post_ready(&self, outcome: &JobOutcome) -> RegistryResult<()> {
        let url = format!("{}/internal/videos/ready", self.config.base_url);
        debug!(video_id = %outcome.video_id, "Reporting job outcome to registry");

        let response = self
            .http
            .post(&url)
            .json(outcome)
            .send()
            .await
            .map_err(RegistryError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl RegistryNotifier for RegistryClient {
    async fn report_ready(&self, outcome: &JobOutcome) -> RegistryResult<()> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            match self.post_ready(outcome).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = Duration::from_millis(500 * 2u64.pow(attempt));
                    warn!(
                        video_id = %outcome.video_id,
                        "Registry call failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(RegistryError::RequestFailed {
            status: 0,
            body: "Unknown error".to_string(),
        }))
    }
}
