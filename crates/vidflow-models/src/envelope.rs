//! Job envelope models.
//!
//! One envelope is decoded from each queue message and describes everything
//! the pipeline needs: where the source lives, how to name the artifacts,
//! and which quality variants to produce.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a video processing job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Output container for transcoded variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// HLS playlist plus MPEG-TS segments.
    #[default]
    Hls,
    /// Single MP4 file.
    Mp4,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Hls => "hls",
            OutputFormat::Mp4 => "mp4",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-job transcoding options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Quality labels to produce, in order. Must be non-empty and resolve
    /// against the resolution table.
    pub qualities: Vec<String>,
    /// Output container.
    pub output_format: OutputFormat,
    /// HLS segment length in seconds. Ignored for MP4.
    #[serde(default = "default_segment_duration")]
    pub segment_duration: u32,
}

fn default_segment_duration() -> u32 {
    10
}

impl ProcessingOptions {
    /// Options applied to legacy (v1) messages that carry no options at all.
    pub fn legacy_defaults() -> Self {
        Self {
            qualities: vec!["144p".to_string(), "360p".to_string(), "720p".to_string()],
            output_format: OutputFormat::Hls,
            segment_duration: 10,
        }
    }
}

/// A fully decoded video processing job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEnvelope {
    /// Video ID the job belongs to.
    pub video_id: VideoId,
    /// Time-bounded signed URL the source is fetched from.
    pub signed_url: String,
    /// Identifier used to name uploaded artifacts.
    pub object_name: String,
    /// Expiry of the signed URL, if the producer communicated one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Transcoding options.
    pub processing_options: ProcessingOptions,
}

/// Validation errors for a decoded envelope.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("signed_url is empty")]
    MissingSource,
    #[error("qualities list is empty")]
    NoQualities,
    #[error("segment_duration must be positive")]
    ZeroSegmentDuration,
}

impl JobEnvelope {
    /// Build an envelope for a legacy (v1) message: a bare source URL with
    /// default processing options and a synthetic video id.
    pub fn legacy(message_id: &str, source_url: impl Into<String>) -> Self {
        Self {
            video_id: VideoId::from_string(format!("legacy-{}", message_id)),
            signed_url: source_url.into(),
            object_name: format!("legacy-{}", message_id),
            expires_at: None,
            processing_options: ProcessingOptions::legacy_defaults(),
        }
    }

    /// Check structural invariants that hold for every wire version.
    pub fn validate(&self) -> Result<(), EnvelopeError> {
        if self.signed_url.trim().is_empty() {
            return Err(EnvelopeError::MissingSource);
        }
        if self.processing_options.qualities.is_empty() {
            return Err(EnvelopeError::NoQualities);
        }
        if self.processing_options.output_format == OutputFormat::Hls
            && self.processing_options.segment_duration == 0
        {
            return Err(EnvelopeError::ZeroSegmentDuration);
        }
        Ok(())
    }

    /// Whether the source locator has expired as of `now`.
    ///
    /// Envelopes without an expiry never expire.
    pub fn source_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at <= now,
            None => false,
        }
    }
}
