//! AMQP job intake for the transcode worker.
//!
//! This crate provides:
//! - Broker connection with startup backoff
//! - Durable queue declaration, QoS/prefetch, manual-ack consumption
//! - Wire-version aware decoding of deliveries into job envelopes
//! - The acknowledgement actions the worker maps dispositions onto

pub mod broker;
pub mod decode;
pub mod error;

pub use broker::{connect_with_backoff, BrokerConsumer, JobDelivery, QueueConfig};
pub use decode::{decode_envelope, DecodeError, WireVersion};
pub use error::{QueueError, QueueResult};
