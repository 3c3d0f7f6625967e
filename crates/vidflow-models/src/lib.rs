//! Shared data models for the VidFlow transcode worker.
//!
//! This crate provides Serde-serializable types for:
//! - Job envelopes and processing options
//! - The fixed quality/resolution table
//! - Per-variant results and the aggregate job outcome

pub mod envelope;
pub mod outcome;
pub mod resolution;

// Re-export common types
pub use envelope::{EnvelopeError, JobEnvelope, OutputFormat, ProcessingOptions, VideoId};
pub use outcome::{JobOutcome, JobStatus, VariantResult, VariantStatus};
pub use resolution::{Resolution, ResolutionTable};
