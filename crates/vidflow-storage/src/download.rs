//! Signed-URL source download over HTTP.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Download `url` into `dest`, streaming the body to disk.
///
/// Non-2xx responses and transport errors both fail the download; parent
/// directories are created as needed.
pub async fn download_to_file(
    http: &reqwest::Client,
    url: &str,
    dest: impl AsRef<Path>,
    timeout: Duration,
) -> StorageResult<()> {
    let dest = dest.as_ref();
    debug!("Downloading source to {}", dest.display());

    let response = http
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                StorageError::Timeout(timeout.as_secs())
            } else {
                StorageError::download_failed(e.to_string())
            }
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(StorageError::DownloadStatus(status.as_u16()));
    }

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            if e.is_timeout() {
                StorageError::Timeout(timeout.as_secs())
            } else {
                StorageError::download_failed(e.to_string())
            }
        })?;
        written += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }

    file.flush().await?;
    info!(bytes = written, "Source download complete");
    Ok(())
}
