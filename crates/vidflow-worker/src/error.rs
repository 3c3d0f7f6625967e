//! Worker error taxonomy.
//!
//! Job-level errors ([`WorkerError`]) abort the whole pipeline and cause the
//! message to be requeued. Variant-level errors ([`VariantError`]) are
//! isolated: they end up inside one `VariantResult` and never abort sibling
//! variants or the job.

use chrono::{DateTime, Utc};
use thiserror::Error;

use vidflow_media::MediaError;
use vidflow_queue::QueueError;
use vidflow_registry::RegistryError;
use vidflow_storage::StorageError;

pub type WorkerResult<T> = Result<T, WorkerError>;

/// Job-level fatal errors.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to create working directory: {0}")]
    WorkDirSetup(#[source] std::io::Error),

    #[error("Source locator expired at {0}")]
    SourceExpired(DateTime<Utc>),

    #[error("Source download failed: {0}")]
    Download(#[source] StorageError),

    #[error("Registry notification failed: {0}")]
    Notify(#[source] RegistryError),

    #[error("Job exceeded {0} second deadline")]
    DeadlineExceeded(u64),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Per-variant fatal errors, recorded in the variant's result.
#[derive(Debug, Error)]
pub enum VariantError {
    #[error("unsupported quality: {0}")]
    UnsupportedQuality(String),

    #[error("transcode failed: {0}")]
    Transcode(#[from] MediaError),

    #[error("artifact upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("presign failed: {0}")]
    Presign(#[source] StorageError),
}
