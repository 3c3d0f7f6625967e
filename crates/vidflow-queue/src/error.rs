//! Queue error types.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors that can occur on the broker connection.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("AMQP error: {0}")]
    Amqp(#[from] lapin::Error),

    #[error("Broker unreachable after {attempts} attempts: {last_error}")]
    ConnectExhausted { attempts: u32, last_error: String },
}
