//! Per-job pipeline state machine.
//!
//! One pipeline instance owns one job from delivery to terminal state:
//! Received → Downloading → TranscodingVariants → UploadingVariants →
//! Aggregating → Notifying → {Completed | Failed}. Variant failures are
//! isolated (§variants); job-level failures abort the run. The working
//! directory is removed on every exit path, including panics and the
//! job-wide deadline.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;
use tracing::{error, info, warn};

use vidflow_media::Transcoder;
use vidflow_models::{JobEnvelope, JobOutcome, ResolutionTable, VideoId};
use vidflow_registry::RegistryNotifier;
use vidflow_storage::StorageGateway;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::variants::process_variants;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStage {
    Received,
    Downloading,
    TranscodingVariants,
    UploadingVariants,
    Aggregating,
    Notifying,
}

impl JobStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStage::Received => "received",
            JobStage::Downloading => "downloading",
            JobStage::TranscodingVariants => "transcoding_variants",
            JobStage::UploadingVariants => "uploading_variants",
            JobStage::Aggregating => "aggregating",
            JobStage::Notifying => "notifying",
        }
    }
}

/// Shared collaborators for all pipelines.
///
/// Constructed once at process start and handed to every pipeline; none of
/// the handles carry per-job mutable state.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub resolutions: ResolutionTable,
    pub storage: Arc<dyn StorageGateway>,
    pub transcoder: Arc<dyn Transcoder>,
    pub registry: Arc<dyn RegistryNotifier>,
}

impl ProcessingContext {
    pub fn new(
        config: WorkerConfig,
        resolutions: ResolutionTable,
        storage: Arc<dyn StorageGateway>,
        transcoder: Arc<dyn Transcoder>,
        registry: Arc<dyn RegistryNotifier>,
    ) -> Self {
        Self {
            config,
            resolutions,
            storage,
            transcoder,
            registry,
        }
    }
}

/// Scratch space exclusive to one pipeline instance.
///
/// Backed by a uniquely named directory under the configured work root; the
/// whole tree is removed when the guard drops, whichever way the pipeline
/// exits.
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Create the per-job directory under `root`.
    pub fn create(root: &Path, video_id: &VideoId) -> std::io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("job-{}-", video_id))
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the downloaded source lands.
    pub fn source_path(&self) -> PathBuf {
        self.dir.path().join("source.mp4")
    }

    /// Output directory for one quality variant.
    pub fn variant_dir(&self, quality: &str) -> PathBuf {
        self.dir.path().join("variants").join(quality)
    }
}

/// Drives one job to a terminal state.
pub struct JobPipeline {
    ctx: Arc<ProcessingContext>,
}

impl JobPipeline {
    pub fn new(ctx: Arc<ProcessingContext>) -> Self {
        Self { ctx }
    }

    /// Run the job under the job-wide deadline.
    ///
    /// The deadline covers download, transcoding, upload and notify. When it
    /// fires, the stage future is dropped, which kills any in-flight ffmpeg
    /// child and abandons in-flight network calls; the working directory is
    /// removed with it.
    pub async fn run(&self, envelope: &JobEnvelope) -> WorkerResult<JobOutcome> {
        let deadline = self.ctx.config.process_timeout;

        match tokio::time::timeout(deadline, self.execute(envelope)).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    video_id = %envelope.video_id,
                    "Job exceeded {}s deadline, cancelling",
                    deadline.as_secs()
                );
                Err(WorkerError::DeadlineExceeded(deadline.as_secs()))
            }
        }
    }

    async fn execute(&self, envelope: &JobEnvelope) -> WorkerResult<JobOutcome> {
        info!(
            video_id = %envelope.video_id,
            stage = JobStage::Received.as_str(),
            qualities = envelope.processing_options.qualities.len(),
            format = %envelope.processing_options.output_format,
            "Processing job"
        );

        let work_dir = WorkDir::create(&self.ctx.config.work_dir, &envelope.video_id)
            .map_err(WorkerError::WorkDirSetup)?;

        self.download_source(envelope, &work_dir).await?;

        // Transcode + upload phases; variant failures stay inside the
        // returned results.
        let results = process_variants(&self.ctx, envelope, &work_dir).await;

        info!(
            video_id = %envelope.video_id,
            stage = JobStage::Aggregating.as_str(),
            variants = results.len(),
            succeeded = results.iter().filter(|r| r.is_success()).count(),
            "Aggregating variant results"
        );
        let outcome = JobOutcome::ready(envelope.video_id.clone(), results);

        info!(
            video_id = %envelope.video_id,
            stage = JobStage::Notifying.as_str(),
            "Reporting job outcome"
        );
        self.ctx
            .registry
            .report_ready(&outcome)
            .await
            .map_err(WorkerError::Notify)?;

        Ok(outcome)
        // work_dir drops here; the scratch tree is removed on this and every
        // earlier return path.
    }

    /// Validate the locator, then fetch the source into the working
    /// directory.
    async fn download_source(&self, envelope: &JobEnvelope, work_dir: &WorkDir) -> WorkerResult<()> {
        if let Some(expires_at) = envelope.expires_at {
            if expires_at <= Utc::now() {
                warn!(
                    video_id = %envelope.video_id,
                    stage = JobStage::Downloading.as_str(),
                    %expires_at,
                    "Source locator already expired"
                );
                return Err(WorkerError::SourceExpired(expires_at));
            }
        }

        info!(
            video_id = %envelope.video_id,
            stage = JobStage::Downloading.as_str(),
            "Downloading source"
        );

        self.ctx
            .storage
            .download(
                &envelope.signed_url,
                &work_dir.source_path(),
                self.ctx.config.process_timeout,
            )
            .await
            .map_err(WorkerError::Download)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_names() {
        assert_eq!(JobStage::Received.as_str(), "received");
        assert_eq!(JobStage::TranscodingVariants.as_str(), "transcoding_variants");
        assert_eq!(JobStage::Notifying.as_str(), "notifying");
    }

    #[test]
    fn test_work_dir_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let video_id = VideoId::from_string("v1");

        let work_dir = WorkDir::create(root.path(), &video_id).unwrap();
        let path = work_dir.path().to_path_buf();
        std::fs::create_dir_all(work_dir.variant_dir("144p")).unwrap();
        std::fs::write(work_dir.source_path(), b"data").unwrap();
        assert!(path.exists());

        drop(work_dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_work_dirs_are_exclusive() {
        let root = tempfile::tempdir().unwrap();
        let video_id = VideoId::from_string("v1");

        let a = WorkDir::create(root.path(), &video_id).unwrap();
        let b = WorkDir::create(root.path(), &video_id).unwrap();
        assert_ne!(a.path(), b.path());
    }
}
