use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, gauge};
use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::concurrency::shutdown::ShutdownRx;
use crate::config::DeletionConfig;
use crate::metrics::{
    BOOKSHELF_DELETION_BATCHES_FLUSHED_TOTAL, BOOKSHELF_DELETION_FLUSH_FAILURES_TOTAL,
    BOOKSHELF_DELETION_PENDING,
};
use crate::store::{DeletionTarget, Store, StoreError};

#[derive(Debug, Error)]
pub enum BatchFlushError {
    /// Every attempt to commit a batch failed.
    #[error("failed to commit a batch of {batch_size} deletions after {attempts} attempts: {source}")]
    Exhausted {
        batch_size: usize,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("deletion batcher task panicked: {0}")]
    Panicked(String),
}

/// Outcome of committing one full batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushOutcome {
    Committed,
    /// Shutdown arrived while waiting to retry, the batch was dropped.
    Interrupted,
}

/// Handle to a running deletion batcher.
#[derive(Debug)]
pub struct DeletionBatcherHandle {
    join_handle: JoinHandle<Result<(), BatchFlushError>>,
}

impl DeletionBatcherHandle {
    /// Waits for the batcher to stop.
    ///
    /// Returns `Ok(())` after a shutdown and an error when a batch could not be
    /// committed, after which queued deletions are no longer processed.
    pub async fn wait(self) -> Result<(), BatchFlushError> {
        match self.join_handle.await {
            Ok(result) => result,
            Err(err) => {
                error!(error = %err, "deletion batcher task panicked");
                Err(BatchFlushError::Panicked(err.to_string()))
            }
        }
    }
}

/// Background worker committing queued deletions in fixed size batches.
pub struct DeletionBatcher {
    store: Arc<dyn Store>,
    config: DeletionConfig,
    rx: mpsc::Receiver<DeletionTarget>,
    shutdown_rx: ShutdownRx,
}

impl DeletionBatcher {
    pub(super) fn new(
        store: Arc<dyn Store>,
        config: DeletionConfig,
        rx: mpsc::Receiver<DeletionTarget>,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            store,
            config,
            rx,
            shutdown_rx,
        }
    }

    /// Starts the batcher in a background task.
    pub fn start(self) -> DeletionBatcherHandle {
        let join_handle = tokio::spawn(self.run());

        DeletionBatcherHandle { join_handle }
    }

    async fn run(mut self) -> Result<(), BatchFlushError> {
        let batch_size = self.config.batch_size.max(1);
        info!(
            batch_size,
            max_flush_attempts = self.config.max_flush_attempts,
            "starting deletion batcher"
        );

        let mut pending = Vec::with_capacity(batch_size);
        loop {
            let remaining = batch_size - pending.len();

            tokio::select! {
                biased;

                _ = self.shutdown_rx.wait_for_shutdown() => {
                    abandon(&pending, "deletion batcher shutting down");
                    return Ok(());
                }
                received = self.rx.recv_many(&mut pending, remaining) => {
                    // Zero means every queue handle was dropped and the buffer is empty.
                    if received == 0 {
                        abandon(&pending, "deletion queue closed");
                        return Ok(());
                    }

                    gauge!(BOOKSHELF_DELETION_PENDING).set(pending.len() as f64);

                    if pending.len() == batch_size {
                        let batch = std::mem::replace(&mut pending, Vec::with_capacity(batch_size));
                        gauge!(BOOKSHELF_DELETION_PENDING).set(0.0);

                        if self.flush(batch).await? == FlushOutcome::Interrupted {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    /// Commits `batch`, retrying with exponential backoff until it succeeds or the
    /// configured attempts are used up.
    async fn flush(&mut self, batch: Vec<DeletionTarget>) -> Result<FlushOutcome, BatchFlushError> {
        let max_attempts = self.config.max_flush_attempts.max(1);
        let max_backoff = Duration::from_millis(self.config.max_backoff_ms);
        let mut backoff = Duration::from_millis(self.config.initial_backoff_ms);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let err = match self.store.delete_batch(&batch).await {
                Ok(deleted) => {
                    counter!(BOOKSHELF_DELETION_BATCHES_FLUSHED_TOTAL).increment(1);
                    info!(
                        batch_size = batch.len(),
                        deleted,
                        attempt,
                        "deletion batch committed"
                    );
                    return Ok(FlushOutcome::Committed);
                }
                Err(err) => err,
            };

            counter!(BOOKSHELF_DELETION_FLUSH_FAILURES_TOTAL).increment(1);

            if attempt >= max_attempts {
                error!(
                    error = %err,
                    batch_size = batch.len(),
                    attempts = attempt,
                    "giving up on deletion batch"
                );
                return Err(BatchFlushError::Exhausted {
                    batch_size: batch.len(),
                    attempts: attempt,
                    source: err,
                });
            }

            let jittered_backoff = calculate_backoff(backoff, self.config.jitter_percent);
            warn!(
                error = %err,
                attempt,
                max_attempts,
                backoff_ms = jittered_backoff.as_millis() as u64,
                "deletion batch failed, will retry after backoff"
            );

            tokio::select! {
                _ = sleep(jittered_backoff) => {}
                _ = self.shutdown_rx.wait_for_shutdown() => {
                    abandon(&batch, "deletion batcher shutting down during backoff");
                    return Ok(FlushOutcome::Interrupted);
                }
            }

            backoff = (backoff * 2).min(max_backoff);
        }
    }
}

/// Applies random jitter of up to `jitter_percent` in both directions to `base_backoff`.
fn calculate_backoff(base_backoff: Duration, jitter_percent: u8) -> Duration {
    let jitter_fraction = f64::from(jitter_percent.min(100)) / 100.0;
    let jitter_range = base_backoff.as_secs_f64() * jitter_fraction;

    let mut rng = rand::rng();
    let jitter = rng.random_range(-jitter_range..=jitter_range);

    Duration::from_secs_f64((base_backoff.as_secs_f64() + jitter).max(0.0))
}

fn abandon(targets: &[DeletionTarget], reason: &str) {
    if targets.is_empty() {
        info!("{reason}");
        return;
    }

    warn!(abandoned = targets.len(), "{reason}, queued deletions are dropped");
    gauge!(BOOKSHELF_DELETION_PENDING).set(0.0);
}
