//! Acknowledgement controller.
//!
//! Maps a pipeline's terminal state to the broker action. There is no
//! bounded retry count or dead-letter routing here: a permanently failing
//! job requeues indefinitely (known hardening point, see DESIGN.md).

use tracing::error;

use vidflow_models::JobOutcome;
use vidflow_queue::JobDelivery;

use crate::error::WorkerResult;

/// Terminal disposition of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Pipeline completed; remove the message from the queue.
    Ack,
    /// Job-level failure; negative-acknowledge with requeue.
    Requeue,
    /// Malformed message; discard without requeue.
    Drop,
}

impl Disposition {
    /// Disposition for a pipeline that ran to a terminal state.
    pub fn for_outcome(result: &WorkerResult<JobOutcome>) -> Self {
        match result {
            Ok(_) => Disposition::Ack,
            Err(_) => Disposition::Requeue,
        }
    }
}

/// Communicate a disposition back to the broker.
///
/// Settlement failures are logged, not propagated: the message will be
/// redelivered once the broker notices the dead channel, and the job itself
/// has already reached a terminal state.
pub async fn settle(delivery: &JobDelivery, disposition: Disposition) {
    let result = match disposition {
        Disposition::Ack => delivery.ack().await,
        Disposition::Requeue => delivery.requeue().await,
        Disposition::Drop => delivery.drop_message().await,
    };

    if let Err(e) = result {
        error!(
            message_id = %delivery.message_id,
            ?disposition,
            "Failed to settle message: {}",
            e
        );
    }
}
