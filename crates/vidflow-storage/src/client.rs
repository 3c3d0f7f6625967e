//! MinIO client implementation (S3 API).

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use chrono::Utc;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::gateway::PresignedUrl;

/// Configuration for the MinIO client.
#[derive(Debug, Clone)]
pub struct MinioConfig {
    /// Endpoint in host:port form
    pub endpoint: String,
    /// Access key ID
    pub access_key: String,
    /// Secret access key
    pub secret_key: String,
    /// Bucket name
    pub bucket: String,
    /// Whether to talk TLS to the endpoint
    pub use_ssl: bool,
    /// Region (MinIO accepts any; kept for SDK config)
    pub region: String,
}

impl MinioConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint: std::env::var("MINIO_ENDPOINT").unwrap_or_else(|_| "minio:9000".to_string()),
            access_key: std::env::var("MINIO_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("MINIO_ACCESS_KEY not set"))?,
            secret_key: std::env::var("MINIO_SECRET_KEY")
                .map_err(|_| StorageError::config_error("MINIO_SECRET_KEY not set"))?,
            bucket: std::env::var("MINIO_BUCKET_NAME").unwrap_or_else(|_| "videos".to_string()),
            use_ssl: std::env::var("MINIO_USE_SSL")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
            region: std::env::var("MINIO_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
        })
    }

    /// Full endpoint URL for the SDK.
    pub fn endpoint_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        format!("{}://{}", scheme, self.endpoint)
    }
}

/// MinIO storage client.
#[derive(Clone)]
pub struct StorageClient {
    s3: Client,
    http: reqwest::Client,
    bucket: String,
}

impl StorageClient {
    /// Create a new client from configuration.
    pub fn new(config: MinioConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "minio",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(config.endpoint_url())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let s3 = Client::from_conf(sdk_config);
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::config_error(e.to_string()))?;

        Ok(Self {
            s3,
            http,
            bucket: config.bucket,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::new(MinioConfig::from_env()?)
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Create the bucket when it does not exist yet.
    pub async fn ensure_bucket(&self) -> StorageResult<()> {
        match self.s3.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => Ok(()),
            Err(_) => {
                self.s3
                    .create_bucket()
                    .bucket(&self.bucket)
                    .send()
                    .await
                    .map_err(|e| StorageError::AwsSdk(e.to_string()))?;
                info!(bucket = %self.bucket, "Created storage bucket");
                Ok(())
            }
        }
    }

    /// Upload a local file under `key`.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        timeout: Duration,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        let request = self
            .s3
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type_for(path))
            .send();

        match tokio::time::timeout(timeout, request).await {
            Ok(result) => {
                result.map_err(|e| StorageError::upload_failed(e.to_string()))?;
            }
            Err(_) => return Err(StorageError::Timeout(timeout.as_secs())),
        }

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    /// Generate a presigned GET URL for `key`.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<PresignedUrl> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .s3
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(PresignedUrl {
            url: presigned.uri().to_string(),
            expires_at: Utc::now()
                + chrono::Duration::from_std(expires_in)
                    .map_err(|e| StorageError::PresignFailed(e.to_string()))?,
        })
    }

    /// Check connectivity by heading the bucket.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.s3
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::AwsSdk(format!("storage connectivity check failed: {}", e)))?;
        Ok(())
    }
}

/// Content type for an artifact, by extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("mp4") => "video/mp4",
        Some("m3u8") => "application/vnd.apple.mpegurl",
        Some("ts") => "video/mp2t",
        _ => "application/octet-stream",
    }
}
