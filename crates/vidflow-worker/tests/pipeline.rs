//! End-to-end pipeline tests against in-memory collaborators.
//!
//! The real broker, storage, registry and ffmpeg are replaced by fakes; the
//! pipeline logic under test is the production code.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use vidflow_media::{MediaError, MediaResult, TranscodeOutput, Transcoder, VariantSpec};
use vidflow_models::{
    JobEnvelope, JobStatus, OutputFormat, ProcessingOptions, ResolutionTable, VideoId,
};
use vidflow_registry::{RegistryError, RegistryNotifier, RegistryResult};
use vidflow_storage::{PresignedUrl, StorageError, StorageGateway, StorageResult};
use vidflow_worker::{Disposition, JobPipeline, ProcessingContext, WorkerConfig, WorkerError};

#[derive(Default)]
enum DownloadMode {
    #[default]
    Succeed,
    FailStatus(u16),
    Hang,
}

#[derive(Default)]
struct FakeStorage {
    download_mode: DownloadMode,
    download_calls: Mutex<u32>,
    uploads: Mutex<Vec<String>>,
    fail_upload_containing: Option<String>,
    fail_presign: bool,
}

#[async_trait]
impl StorageGateway for FakeStorage {
    async fn download(&self, _url: &str, dest: &Path, _timeout: Duration) -> StorageResult<()> {
        *self.download_calls.lock().unwrap() += 1;
        match self.download_mode {
            DownloadMode::Succeed => {
                if let Some(parent) = dest.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(dest, b"source-bytes").await?;
                Ok(())
            }
            DownloadMode::FailStatus(status) => Err(StorageError::DownloadStatus(status)),
            DownloadMode::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }

    async fn upload(&self, _path: &Path, object_name: &str, _timeout: Duration) -> StorageResult<()> {
        if let Some(fragment) = &self.fail_upload_containing {
            if object_name.contains(fragment.as_str()) {
                return Err(StorageError::upload_failed("injected upload failure"));
            }
        }
        self.uploads.lock().unwrap().push(object_name.to_string());
        Ok(())
    }

    async fn presigned_get(
        &self,
        object_name: &str,
        expiry: Duration,
    ) -> StorageResult<PresignedUrl> {
        if self.fail_presign {
            return Err(StorageError::PresignFailed("injected presign failure".into()));
        }
        Ok(PresignedUrl {
            url: format!("https://storage.test/{}?sig=fake", object_name),
            expires_at: Utc::now() + chrono::Duration::from_std(expiry).unwrap(),
        })
    }
}

#[derive(Default)]
struct FakeTranscoder {
    fail_qualities: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn transcode(
        &self,
        _source: &Path,
        out_dir: &Path,
        spec: &VariantSpec,
    ) -> MediaResult<TranscodeOutput> {
        self.calls.lock().unwrap().push(spec.quality.clone());

        if self.fail_qualities.contains(&spec.quality) {
            return Err(MediaError::ffmpeg_failed(
                "FFmpeg exited with non-zero status",
                None,
                Some(1),
            ));
        }

        tokio::fs::create_dir_all(out_dir).await?;
        match spec.output_format {
            OutputFormat::Hls => {
                let manifest = out_dir.join("index.m3u8");
                let segment = out_dir.join("segment-000.ts");
                tokio::fs::write(&manifest, b"#EXTM3U").await?;
                tokio::fs::write(&segment, b"ts-bytes").await?;
                Ok(TranscodeOutput {
                    files: vec![manifest.clone(), segment],
                    manifest: Some(manifest),
                })
            }
            OutputFormat::Mp4 => {
                let file = out_dir.join(format!("{}.mp4", spec.quality));
                tokio::fs::write(&file, b"mp4-bytes").await?;
                Ok(TranscodeOutput {
                    files: vec![file],
                    manifest: None,
                })
            }
        }
    }
}

#[derive(Default)]
struct FakeRegistry {
    reports: Mutex<Vec<vidflow_models::JobOutcome>>,
    fail: bool,
}

#[async_trait]
impl RegistryNotifier for FakeRegistry {
    async fn report_ready(&self, outcome: &vidflow_models::JobOutcome) -> RegistryResult<()> {
        if self.fail {
            return Err(RegistryError::RequestFailed {
                status: 503,
                body: "injected registry failure".into(),
            });
        }
        self.reports.lock().unwrap().push(outcome.clone());
        Ok(())
    }
}

struct Harness {
    work_root: tempfile::TempDir,
    storage: Arc<FakeStorage>,
    transcoder: Arc<FakeTranscoder>,
    registry: Arc<FakeRegistry>,
    ctx: Arc<ProcessingContext>,
}

impl Harness {
    fn new(storage: FakeStorage, transcoder: FakeTranscoder, registry: FakeRegistry) -> Self {
        Self::with_timeout(storage, transcoder, registry, Duration::from_secs(30))
    }

    fn with_timeout(
        storage: FakeStorage,
        transcoder: FakeTranscoder,
        registry: FakeRegistry,
        process_timeout: Duration,
    ) -> Self {
        let work_root = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            max_concurrency: 2,
            process_timeout,
            shutdown_timeout: Duration::from_secs(1),
            work_dir: work_root.path().to_path_buf(),
            signed_url_expiry: Duration::from_secs(3600),
        };

        let storage = Arc::new(storage);
        let transcoder = Arc::new(transcoder);
        let registry = Arc::new(registry);

        let ctx = Arc::new(ProcessingContext::new(
            config,
            ResolutionTable::standard(),
            Arc::clone(&storage) as Arc<dyn StorageGateway>,
            Arc::clone(&transcoder) as Arc<dyn Transcoder>,
            Arc::clone(&registry) as Arc<dyn RegistryNotifier>,
        ));

        Self {
            work_root,
            storage,
            transcoder,
            registry,
            ctx,
        }
    }

    async fn run(&self, envelope: &JobEnvelope) -> vidflow_worker::WorkerResult<vidflow_models::JobOutcome> {
        JobPipeline::new(Arc::clone(&self.ctx)).run(envelope).await
    }

    fn work_root_is_empty(&self) -> bool {
        std::fs::read_dir(self.work_root.path())
            .map(|entries| entries.count() == 0)
            .unwrap_or(false)
    }

    fn uploaded_keys(&self) -> Vec<String> {
        self.storage.uploads.lock().unwrap().clone()
    }

    fn transcoded_qualities(&self) -> Vec<String> {
        self.transcoder.calls.lock().unwrap().clone()
    }
}

fn envelope(qualities: &[&str], format: OutputFormat) -> JobEnvelope {
    JobEnvelope {
        video_id: VideoId::from_string("v1"),
        signed_url: "https://storage.test/source/v1?sig=abc".to_string(),
        object_name: "v1.mp4".to_string(),
        expires_at: None,
        processing_options: ProcessingOptions {
            qualities: qualities.iter().map(|q| q.to_string()).collect(),
            output_format: format,
            segment_duration: 10,
        },
    }
}

#[tokio::test]
async fn one_result_per_quality_in_request_order() {
    let harness = Harness::new(
        FakeStorage::default(),
        FakeTranscoder::default(),
        FakeRegistry::default(),
    );
    // "480p" is not in the resolution table.
    let envelope = envelope(&["144p", "480p", "720p"], OutputFormat::Hls);

    let outcome = harness.run(&envelope).await.unwrap();

    let qualities: Vec<_> = outcome.qualities.iter().map(|q| q.quality.clone()).collect();
    assert_eq!(qualities, vec!["144p", "480p", "720p"]);

    assert!(outcome.qualities[0].is_success());
    assert!(!outcome.qualities[1].is_success());
    assert!(outcome.qualities[2].is_success());
    assert!(outcome.qualities[1]
        .error
        .as_deref()
        .unwrap()
        .contains("unsupported quality"));

    // The unknown label never reached the transcoder.
    assert_eq!(harness.transcoded_qualities(), vec!["144p", "720p"]);
}

#[tokio::test]
async fn hls_job_uploads_manifests_and_reports_ready() {
    let harness = Harness::new(
        FakeStorage::default(),
        FakeTranscoder::default(),
        FakeRegistry::default(),
    );
    let envelope = envelope(&["144p", "720p"], OutputFormat::Hls);

    let result = harness.run(&envelope).await;
    let outcome = result.as_ref().unwrap();

    assert_eq!(outcome.status, JobStatus::Success);
    assert_eq!(outcome.qualities.len(), 2);
    for variant in &outcome.qualities {
        assert!(variant.is_success());
        assert!(variant.signed_url.is_some());
    }
    assert_eq!(
        outcome.qualities[0].manifest_locator.as_deref(),
        Some("processed/v1/144p/index.m3u8")
    );
    assert_eq!(
        outcome.qualities[1].manifest_locator.as_deref(),
        Some("processed/v1/720p/index.m3u8")
    );

    let keys = harness.uploaded_keys();
    assert!(keys.contains(&"processed/v1/144p/index.m3u8".to_string()));
    assert!(keys.contains(&"processed/v1/144p/segment-000.ts".to_string()));
    assert!(keys.contains(&"processed/v1/720p/index.m3u8".to_string()));
    assert!(keys.contains(&"processed/v1/720p/segment-000.ts".to_string()));

    assert_eq!(harness.registry.reports.lock().unwrap().len(), 1);
    assert_eq!(Disposition::for_outcome(&result), Disposition::Ack);
}

#[tokio::test]
async fn variant_tool_failure_is_isolated_and_job_still_acked() {
    let transcoder = FakeTranscoder {
        fail_qualities: HashSet::from(["720p".to_string()]),
        ..FakeTranscoder::default()
    };
    let harness = Harness::new(FakeStorage::default(), transcoder, FakeRegistry::default());
    let envelope = envelope(&["144p", "720p"], OutputFormat::Hls);

    let result = harness.run(&envelope).await;
    let outcome = result.as_ref().unwrap();

    assert_eq!(outcome.status, JobStatus::Success);
    assert!(outcome.qualities[0].is_success());
    assert!(!outcome.qualities[1].is_success());

    // Nothing of the failed variant reached storage.
    assert!(harness
        .uploaded_keys()
        .iter()
        .all(|k| !k.contains("processed/v1/720p")));

    // The registry still heard about the job.
    assert_eq!(harness.registry.reports.lock().unwrap().len(), 1);
    assert_eq!(Disposition::for_outcome(&result), Disposition::Ack);
}

#[tokio::test]
async fn expired_locator_fails_before_any_transcode() {
    let harness = Harness::new(
        FakeStorage::default(),
        FakeTranscoder::default(),
        FakeRegistry::default(),
    );
    let mut envelope = envelope(&["144p", "720p"], OutputFormat::Hls);
    envelope.expires_at = Some(Utc::now() - chrono::Duration::hours(1));

    let result = harness.run(&envelope).await;

    assert!(matches!(result, Err(WorkerError::SourceExpired(_))));
    assert_eq!(*harness.storage.download_calls.lock().unwrap(), 0);
    assert!(harness.transcoded_qualities().is_empty());
    assert!(harness.work_root_is_empty());
    assert_eq!(Disposition::for_outcome(&result), Disposition::Requeue);
}

#[tokio::test]
async fn download_timeout_requeues_without_variants() {
    let storage = FakeStorage {
        download_mode: DownloadMode::Hang,
        ..FakeStorage::default()
    };
    let harness = Harness::with_timeout(
        storage,
        FakeTranscoder::default(),
        FakeRegistry::default(),
        Duration::from_millis(250),
    );
    let envelope = envelope(&["144p"], OutputFormat::Hls);

    let result = harness.run(&envelope).await;

    assert!(matches!(result, Err(WorkerError::DeadlineExceeded(_))));
    assert!(harness.transcoded_qualities().is_empty());
    assert!(harness.work_root_is_empty());
    assert_eq!(Disposition::for_outcome(&result), Disposition::Requeue);
}

#[tokio::test]
async fn download_http_failure_is_job_fatal() {
    let storage = FakeStorage {
        download_mode: DownloadMode::FailStatus(404),
        ..FakeStorage::default()
    };
    let harness = Harness::new(storage, FakeTranscoder::default(), FakeRegistry::default());
    let envelope = envelope(&["144p"], OutputFormat::Hls);

    let result = harness.run(&envelope).await;

    assert!(matches!(result, Err(WorkerError::Download(_))));
    assert!(harness.transcoded_qualities().is_empty());
    assert!(harness.work_root_is_empty());
    assert_eq!(Disposition::for_outcome(&result), Disposition::Requeue);
}

#[tokio::test]
async fn work_dir_removed_on_success() {
    let harness = Harness::new(
        FakeStorage::default(),
        FakeTranscoder::default(),
        FakeRegistry::default(),
    );
    let envelope = envelope(&["144p"], OutputFormat::Hls);

    harness.run(&envelope).await.unwrap();
    assert!(harness.work_root_is_empty());
}

#[tokio::test]
async fn notify_failure_is_job_fatal_with_cleanup() {
    let registry = FakeRegistry {
        fail: true,
        ..FakeRegistry::default()
    };
    let harness = Harness::new(FakeStorage::default(), FakeTranscoder::default(), registry);
    let envelope = envelope(&["144p"], OutputFormat::Hls);

    let result = harness.run(&envelope).await;

    assert!(matches!(result, Err(WorkerError::Notify(_))));
    assert!(harness.work_root_is_empty());
    assert_eq!(Disposition::for_outcome(&result), Disposition::Requeue);
}

#[tokio::test]
async fn upload_failure_demotes_only_that_variant() {
    let storage = FakeStorage {
        fail_upload_containing: Some("720p".to_string()),
        ..FakeStorage::default()
    };
    let harness = Harness::new(storage, FakeTranscoder::default(), FakeRegistry::default());
    let envelope = envelope(&["144p", "720p"], OutputFormat::Hls);

    let outcome = harness.run(&envelope).await.unwrap();

    assert_eq!(outcome.status, JobStatus::Success);
    assert!(outcome.qualities[0].is_success());
    assert!(!outcome.qualities[1].is_success());
    assert!(outcome.qualities[1]
        .error
        .as_deref()
        .unwrap()
        .contains("upload failed"));
}

#[tokio::test]
async fn presign_failure_demotes_variant_but_job_completes() {
    let storage = FakeStorage {
        fail_presign: true,
        ..FakeStorage::default()
    };
    let harness = Harness::new(storage, FakeTranscoder::default(), FakeRegistry::default());
    let envelope = envelope(&["144p"], OutputFormat::Hls);

    let result = harness.run(&envelope).await;
    let outcome = result.as_ref().unwrap();

    assert_eq!(outcome.status, JobStatus::Success);
    assert!(!outcome.qualities[0].is_success());
    assert_eq!(Disposition::for_outcome(&result), Disposition::Ack);
}

#[tokio::test]
async fn mp4_variant_presigns_the_file_itself() {
    let harness = Harness::new(
        FakeStorage::default(),
        FakeTranscoder::default(),
        FakeRegistry::default(),
    );
    let envelope = envelope(&["360p"], OutputFormat::Mp4);

    let outcome = harness.run(&envelope).await.unwrap();
    let variant = &outcome.qualities[0];

    assert!(variant.is_success());
    assert_eq!(variant.object_name, "processed/v1/360p");
    assert!(variant.manifest_locator.is_none());
    assert!(variant
        .signed_url
        .as_deref()
        .unwrap()
        .contains("processed/v1/360p/360p.mp4"));
}
