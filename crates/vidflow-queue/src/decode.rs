//! Wire-version aware message decoding.
//!
//! Two wire versions are in production:
//! - v1 (legacy): the body is a bare source URL; all options are defaulted.
//! - v2: the body is a JSON job envelope.
//!
//! The version is carried in the `message_version` header; messages without
//! the header are treated as v1.

use lapin::types::{AMQPValue, FieldTable, ShortString};
use thiserror::Error;

use vidflow_models::{EnvelopeError, JobEnvelope};

/// Header that selects the wire version.
const VERSION_HEADER: &str = "message_version";

/// Supported wire versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireVersion {
    V1,
    V2,
}

impl WireVersion {
    /// Read the wire version from delivery headers, defaulting to v1.
    pub fn from_headers(headers: Option<&FieldTable>) -> Self {
        let value = headers.and_then(|table| {
            table
                .inner()
                .get(&ShortString::from(VERSION_HEADER))
                .and_then(header_as_str)
        });

        match value.as_deref() {
            Some("v2") => WireVersion::V2,
            _ => WireVersion::V1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WireVersion::V1 => "v1",
            WireVersion::V2 => "v2",
        }
    }
}

fn header_as_str(value: &AMQPValue) -> Option<String> {
    match value {
        AMQPValue::LongString(s) => Some(String::from_utf8_lossy(s.as_bytes()).into_owned()),
        AMQPValue::ShortString(s) => Some(s.as_str().to_string()),
        _ => None,
    }
}

/// Failures while turning a message body into a job envelope.
///
/// Any of these means the message carries no usable job identity and must be
/// dropped rather than requeued.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message body is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid envelope: {0}")]
    Envelope(#[from] EnvelopeError),
}

/// Decode a message body into a validated job envelope.
///
/// `message_id` seeds the synthetic identity of legacy jobs.
pub fn decode_envelope(
    version: WireVersion,
    message_id: &str,
    body: &[u8],
) -> Result<JobEnvelope, DecodeError> {
    let envelope = match version {
        WireVersion::V1 => {
            let url = std::str::from_utf8(body)?.trim();
            JobEnvelope::legacy(message_id, url)
        }
        WireVersion::V2 => serde_json::from_slice::<JobEnvelope>(body)?,
    };

    envelope.validate()?;
    Ok(envelope)
}
