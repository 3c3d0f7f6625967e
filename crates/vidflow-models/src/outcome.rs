//! Per-variant results and the aggregate job outcome.
//!
//! The outcome is also the wire shape reported to the upstream registry, so
//! fields mirror what that service expects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::envelope::{OutputFormat, VideoId};

/// Status of a single quality variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantStatus {
    Success,
    Failed,
}

/// Result of processing one requested quality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantResult {
    /// Stable identifier for this variant, referenced by the registry.
    pub id: String,
    /// Quality label (e.g. "720p").
    pub quality: String,
    /// Object-storage prefix the variant's artifacts live under.
    pub object_name: String,
    pub status: VariantStatus,
    /// Failure reason, present iff `status == Failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Total size of the variant's artifacts in bytes.
    pub file_size: u64,
    /// Source duration in seconds.
    pub duration: f64,
    /// Output container.
    pub format: OutputFormat,
    /// Object key of the HLS playlist. Absent for MP4 variants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest_locator: Option<String>,
    /// Time-bounded read URL for the variant's entry point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signed_url: Option<String>,
    /// Expiry of `signed_url`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl VariantResult {
    /// Build a successful result.
    pub fn success(
        quality: impl Into<String>,
        object_name: impl Into<String>,
        format: OutputFormat,
        file_size: u64,
        duration: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            quality: quality.into(),
            object_name: object_name.into(),
            status: VariantStatus::Success,
            error: None,
            file_size,
            duration,
            format,
            manifest_locator: None,
            signed_url: None,
            expires_at: None,
        }
    }

    /// Build a failed result carrying the failure reason.
    pub fn failed(
        quality: impl Into<String>,
        format: OutputFormat,
        error: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            quality: quality.into(),
            object_name: String::new(),
            status: VariantStatus::Failed,
            error: Some(error.into()),
            file_size: 0,
            duration: 0.0,
            format,
            manifest_locator: None,
            signed_url: None,
            expires_at: None,
        }
    }

    /// Attach the HLS playlist key.
    pub fn with_manifest(mut self, manifest_locator: impl Into<String>) -> Self {
        self.manifest_locator = Some(manifest_locator.into());
        self
    }

    /// Attach a presigned read URL and its expiry.
    pub fn with_signed_url(mut self, url: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        self.signed_url = Some(url.into());
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == VariantStatus::Success
    }
}

/// Overall job status.
///
/// A job that reached the notify stage is a success even when individual
/// variants failed; `Failed` means a job-level stage could not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Success,
    Failed,
}

/// Aggregate result of one job, reported to the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    pub video_id: VideoId,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processed_at: DateTime<Utc>,
    /// One entry per requested quality, in request order.
    pub qualities: Vec<VariantResult>,
}

impl JobOutcome {
    /// Build the outcome for a job whose pipeline reached the notify stage.
    pub fn ready(video_id: VideoId, qualities: Vec<VariantResult>) -> Self {
        Self {
            video_id,
            status: JobStatus::Success,
            error: None,
            processed_at: Utc::now(),
            qualities,
        }
    }

    /// Number of variants that succeeded.
    pub fn success_count(&self) -> usize {
        self.qualities.iter().filter(|q| q.is_success()).count()
    }
}
