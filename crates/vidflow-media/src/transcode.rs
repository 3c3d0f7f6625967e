//! The `Transcoder` port and its ffmpeg-backed production adapter.
//!
//! The pipeline only ever sees the trait; tests drive it with an in-memory
//! fake, production wires in [`FfmpegTranscoder`].

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use vidflow_models::{OutputFormat, Resolution};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Everything needed to produce one quality variant.
#[derive(Debug, Clone)]
pub struct VariantSpec {
    /// Quality label (e.g. "360p"), used for output naming.
    pub quality: String,
    /// Encoding parameters from the resolution table.
    pub resolution: Resolution,
    /// Output container.
    pub output_format: OutputFormat,
    /// HLS segment length in seconds. Ignored for MP4.
    pub segment_duration: u32,
}

/// Files produced by one transcode pass.
#[derive(Debug, Clone)]
pub struct TranscodeOutput {
    /// Every artifact inside the variant output directory.
    pub files: Vec<PathBuf>,
    /// The HLS playlist, when the container is HLS.
    pub manifest: Option<PathBuf>,
}

/// Port for producing one quality variant from a local source file.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Transcode `source` into `out_dir` according to `spec`.
    ///
    /// A non-zero exit or abnormal termination of the external tool surfaces
    /// as an error; it never panics the caller.
    async fn transcode(
        &self,
        source: &Path,
        out_dir: &Path,
        spec: &VariantSpec,
    ) -> MediaResult<TranscodeOutput>;
}

/// Production adapter that shells out to ffmpeg.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    runner: FfmpegRunner,
}

impl FfmpegTranscoder {
    /// Create an adapter whose invocations are bounded by `timeout_secs`.
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            runner: FfmpegRunner::new().with_timeout(timeout_secs),
        }
    }

    /// Derive the deterministic ffmpeg invocation for a variant.
    pub fn build_command(source: &Path, out_dir: &Path, spec: &VariantSpec) -> FfmpegCommand {
        let scale = format!("scale={}:{}", spec.resolution.width, spec.resolution.height);

        let output = match spec.output_format {
            OutputFormat::Hls => out_dir.join("index.m3u8"),
            OutputFormat::Mp4 => out_dir.join(format!("{}.mp4", spec.quality)),
        };

        let cmd = FfmpegCommand::new(source, output)
            .video_codec("h264")
            .preset("fast")
            .video_bitrate(&spec.resolution.video_bitrate)
            .video_filter(scale)
            .audio_codec("aac");

        match spec.output_format {
            OutputFormat::Hls => cmd
                .output_arg("-hls_time")
                .output_arg(spec.segment_duration.to_string())
                .output_arg("-hls_list_size")
                .output_arg("0")
                .output_arg("-hls_segment_filename")
                .output_arg(
                    out_dir
                        .join("segment-%03d.ts")
                        .to_string_lossy()
                        .to_string(),
                ),
            OutputFormat::Mp4 => cmd.output_arg("-movflags").output_arg("+faststart"),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(
        &self,
        source: &Path,
        out_dir: &Path,
        spec: &VariantSpec,
    ) -> MediaResult<TranscodeOutput> {
        if !source.exists() {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }

        tokio::fs::create_dir_all(out_dir).await?;

        let cmd = Self::build_command(source, out_dir, spec);

        debug!(
            quality = %spec.quality,
            format = %spec.output_format,
            "Transcoding variant"
        );
        self.runner.run(&cmd).await?;

        let files = collect_artifacts(out_dir).await?;
        if files.is_empty() {
            return Err(MediaError::EmptyOutput(out_dir.to_path_buf()));
        }

        let manifest = match spec.output_format {
            OutputFormat::Hls => Some(out_dir.join("index.m3u8")),
            OutputFormat::Mp4 => None,
        };

        info!(
            quality = %spec.quality,
            artifacts = files.len(),
            "Variant transcode complete"
        );

        Ok(TranscodeOutput { files, manifest })
    }
}

/// List the files ffmpeg left in the variant directory, in a stable order.
async fn collect_artifacts(out_dir: &Path) -> MediaResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(out_dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }

    files.sort();
    Ok(files)
}
