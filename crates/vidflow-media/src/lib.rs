//! FFmpeg CLI wrapper for variant transcoding.
//!
//! This crate provides:
//! - A builder/runner pair for ffmpeg invocations with timeout and kill
//! - The `Transcoder` port the pipeline drives, plus its process-backed
//!   production adapter
//! - FFprobe-based source inspection

pub mod command;
pub mod error;
pub mod probe;
pub mod transcode;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use probe::{probe_video, VideoInfo};
pub use transcode::{FfmpegTranscoder, TranscodeOutput, Transcoder, VariantSpec};
