//! The `StorageGateway` port consumed by the pipeline.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

use crate::client::StorageClient;
use crate::download::download_to_file;
use crate::error::StorageResult;

/// A time-bounded read locator for a stored object.
#[derive(Debug, Clone)]
pub struct PresignedUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Object-storage operations the pipeline needs.
///
/// Production wires in [`StorageClient`]; tests use in-memory fakes.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Fetch a source object from a (signed) URL into a local file.
    async fn download(&self, url: &str, dest: &Path, timeout: Duration) -> StorageResult<()>;

    /// Upload a local file under `object_name`.
    async fn upload(&self, path: &Path, object_name: &str, timeout: Duration) -> StorageResult<()>;

    /// Generate a time-bounded read locator for `object_name`.
    async fn presigned_get(&self, object_name: &str, expiry: Duration)
        -> StorageResult<PresignedUrl>;
}

#[async_trait]
impl StorageGateway for StorageClient {
    async fn download(&self, url: &str, dest: &Path, timeout: Duration) -> StorageResult<()> {
        download_to_file(self.http(), url, dest, timeout).await
    }

    async fn upload(&self, path: &Path, object_name: &str, timeout: Duration) -> StorageResult<()> {
        self.upload_file(path, object_name, timeout).await
    }

    async fn presigned_get(
        &self,
        object_name: &str,
        expiry: Duration,
    ) -> StorageResult<PresignedUrl> {
        self.presign_get(object_name, expiry).await
    }
}
