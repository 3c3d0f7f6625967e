//! Video transcode worker.
//!
//! This crate provides:
//! - The queue intake loop with bounded-concurrency dispatch
//! - The per-job pipeline state machine
//! - The variant orchestrator with per-quality failure isolation
//! - The acknowledgement controller mapping outcomes to broker actions

pub mod ack;
pub mod config;
pub mod error;
pub mod intake;
pub mod limiter;
pub mod pipeline;
pub mod variants;

pub use ack::Disposition;
pub use config::WorkerConfig;
pub use error::{VariantError, WorkerError, WorkerResult};
pub use intake::JobIntake;
pub use limiter::ConcurrencyLimiter;
pub use pipeline::{JobPipeline, JobStage, ProcessingContext, WorkDir};
