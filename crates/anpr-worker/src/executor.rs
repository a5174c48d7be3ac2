//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use metrics::gauge;
use tracing::{error, info, warn};
use uuid::Uuid;

use anpr_queue::{JobQueue, ProcessUploadJob};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::processor::{process_upload, ProcessOutcome, ProcessingContext};

/// Pulls jobs off the queue and processes them one at a time.
///
/// Job processing is strictly sequential within one worker; parallelism
/// comes from running more worker processes against the shared queue.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: JobQueue) -> Self {
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor.
    ///
    /// Context construction happens before the first dequeue: a worker whose
    /// detector cannot be built (for the remote backend: whose health probe
    /// fails) never claims a job, so no PROCESSING row is left dangling.
    pub async fn run(&self) -> WorkerResult<()> {
        info!("Starting job executor '{}'", self.consumer_name);

        self.queue.init().await?;
        let ctx = ProcessingContext::new(self.config.clone()).await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_one(&ctx) => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        tokio::time::sleep(Duration::from_secs(self.config.error_backoff_secs)).await;
                    }
                }
            }
        }

        info!("Job executor stopped");
        Ok(())
    }

    /// Dequeue at most one job and process it to completion.
    async fn consume_one(&self, ctx: &ProcessingContext) -> WorkerResult<()> {
        let jobs = self
            .queue
            .consume(&self.consumer_name, self.config.poll_block_ms, 1)
            .await?;

        if let Ok(depth) = self.queue.len().await {
            gauge!("anpr_queue_depth").set(depth as f64);
        }

        for (message_id, job) in jobs {
            self.execute_job(ctx, &message_id, &job).await;
        }

        Ok(())
    }

    /// Run one job and settle its queue message.
    ///
    /// A failed job is acked, never redelivered: its row is already FAILED
    /// with the causal error, and a copy of the payload goes to the DLQ for
    /// operators. One bad job must not block the jobs behind it.
    async fn execute_job(
        &self,
        ctx: &ProcessingContext,
        message_id: &str,
        job: &ProcessUploadJob,
    ) {
        match process_upload(ctx, job).await {
            Ok(ProcessOutcome::Completed) => {
                info!(upload_id = %job.upload_id, "Job completed");
            }
            Ok(ProcessOutcome::AlreadyClaimed) => {}
            Err(e) => {
                error!(upload_id = %job.upload_id, error = %e, "Job failed");
                if let Err(dlq_err) = self.queue.dlq(message_id, job, &e.to_string()).await {
                    error!(upload_id = %job.upload_id, error = %dlq_err, "Failed to record job in DLQ");
                }
            }
        }

        if let Err(e) = self.queue.ack(message_id).await {
            error!(upload_id = %job.upload_id, error = %e, "Failed to ack job");
        }
        if let Err(e) = self.queue.clear_dedup(job).await {
            warn!(upload_id = %job.upload_id, error = %e, "Failed to clear dedup key");
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
