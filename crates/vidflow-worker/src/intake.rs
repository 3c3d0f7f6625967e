//! Queue intake and dispatch.
//!
//! One consumer loop pulls deliveries, decodes them, and dispatches each job
//! as an independent task gated by the concurrency limiter. The loop never
//! blocks on a single job's completion; it does block on admission, which is
//! the backpressure that keeps local resource use bounded.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info, warn};

use vidflow_queue::{BrokerConsumer, JobDelivery, QueueConfig};

use crate::ack::{settle, Disposition};
use crate::error::WorkerResult;
use crate::limiter::ConcurrencyLimiter;
use crate::pipeline::{JobPipeline, ProcessingContext};

/// The consumption loop that feeds pipelines.
pub struct JobIntake {
    ctx: Arc<ProcessingContext>,
    queue_config: QueueConfig,
    limiter: ConcurrencyLimiter,
    shutdown: watch::Sender<bool>,
}

impl JobIntake {
    pub fn new(ctx: Arc<ProcessingContext>, queue_config: QueueConfig) -> Self {
        let limiter = ConcurrencyLimiter::new(ctx.config.max_concurrency);
        let (shutdown, _) = watch::channel(false);

        Self {
            ctx,
            queue_config,
            limiter,
            shutdown,
        }
    }

    /// Signal shutdown; in-flight jobs get the configured grace period.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Consume until shutdown or the broker goes away.
    pub async fn run(&self) -> WorkerResult<()> {
        let prefetch = self.limiter.capacity().min(u16::MAX as usize) as u16;
        info!(
            max_concurrency = self.limiter.capacity(),
            "Starting job intake"
        );

        let mut consumer = BrokerConsumer::bind(&self.queue_config, prefetch).await?;
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping intake");
                        break;
                    }
                }
                delivery = consumer.next() => {
                    match delivery {
                        None => {
                            warn!("Consumer stream ended, stopping intake");
                            break;
                        }
                        Some(Err(e)) => {
                            error!("Broker error while consuming: {}", e);
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                        Some(Ok(delivery)) => self.dispatch(delivery).await,
                    }
                }
            }
        }

        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.ctx.config.shutdown_timeout, self.limiter.wait_idle())
            .await
            .is_err()
        {
            // Abandoned jobs stay unacknowledged; the broker redelivers them.
            warn!(
                "Grace period elapsed with {} job(s) still running",
                self.limiter.capacity() - self.limiter.available()
            );
        }

        consumer.close().await.ok();
        info!("Job intake stopped");
        Ok(())
    }

    /// Decode one delivery and hand it to a pipeline task.
    async fn dispatch(&self, delivery: JobDelivery) {
        // Malformed messages carry no job identity; drop before admission.
        let envelope = match delivery.decode() {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    message_id = %delivery.message_id,
                    version = delivery.version.as_str(),
                    "Dropping malformed message: {}",
                    e
                );
                settle(&delivery, Disposition::Drop).await;
                return;
            }
        };

        let permit = match self.limiter.admit().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        let ctx = Arc::clone(&self.ctx);
        tokio::spawn(async move {
            let _permit = permit;

            let pipeline = JobPipeline::new(ctx);
            let result = pipeline.run(&envelope).await;

            match &result {
                Ok(outcome) => info!(
                    video_id = %envelope.video_id,
                    variants = outcome.qualities.len(),
                    succeeded = outcome.success_count(),
                    "Job completed"
                ),
                Err(e) => error!(
                    video_id = %envelope.video_id,
                    "Job failed: {}",
                    e
                ),
            }

            settle(&delivery, Disposition::for_outcome(&result)).await;
        });
    }
}
