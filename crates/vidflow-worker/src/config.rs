//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent job pipelines; also used as the broker prefetch
    /// count so unacked deliveries mirror local capacity.
    pub max_concurrency: usize,
    /// Job-wide deadline covering download, transcode, upload and notify.
    pub process_timeout: Duration,
    /// Grace period for in-flight jobs on shutdown.
    pub shutdown_timeout: Duration,
    /// Root directory for per-job scratch space.
    pub work_dir: PathBuf,
    /// Validity of presigned URLs handed to the registry.
    pub signed_url_expiry: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 2,
            process_timeout: Duration::from_secs(3600),
            shutdown_timeout: Duration::from_secs(30),
            work_dir: PathBuf::from("/tmp/vidflow"),
            signed_url_expiry: Duration::from_secs(86400),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrency: std::env::var("MAX_CONCURRENCY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|&n| n >= 1)
                .unwrap_or(2),
            process_timeout: Duration::from_secs(
                std::env::var("PROCESS_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            work_dir: std::env::var("WORKING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("/tmp/vidflow")),
            signed_url_expiry: Duration::from_secs(
                std::env::var("SIGNED_URL_DOWNLOAD_EXPIRY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(86400),
            ),
        }
    }
}
