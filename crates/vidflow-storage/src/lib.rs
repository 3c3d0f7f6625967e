//! MinIO object-storage gateway.
//!
//! This crate provides:
//! - The `StorageGateway` port the pipeline drives
//! - An S3-API client for MinIO (upload, presigned GET, bucket setup)
//! - Signed-URL source download over HTTP

pub mod client;
pub mod download;
pub mod error;
pub mod gateway;

pub use client::{MinioConfig, StorageClient};
pub use error::{StorageError, StorageResult};
pub use gateway::{PresignedUrl, StorageGateway};
