//! Upstream registry notifier.
//!
//! A thin typed RPC client that reports finished jobs ("video ready") to the
//! registry service owning video metadata.

pub mod client;
pub mod error;

pub use client::{RegistryClient, RegistryConfig, RegistryNotifier};
pub use error::{RegistryError, RegistryResult};
