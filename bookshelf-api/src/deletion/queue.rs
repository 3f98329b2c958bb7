use metrics::counter;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

use crate::metrics::{BOOKSHELF_DELETIONS_ENQUEUED_TOTAL, KIND_LABEL};
use crate::store::DeletionTarget;

#[derive(Debug, Error)]
pub enum EnqueueError {
    /// The batcher stopped, so nothing will ever drain the queue again.
    #[error("the deletion queue is closed, {} {} was not queued", .0.kind(), .0.id())]
    Closed(DeletionTarget),
}

/// Producer side of the deletion queue, cloned into every request handler.
#[derive(Debug, Clone)]
pub struct DeletionQueue {
    tx: mpsc::Sender<DeletionTarget>,
}

impl DeletionQueue {
    pub(super) fn new(tx: mpsc::Sender<DeletionTarget>) -> Self {
        Self { tx }
    }

    /// Queues `target` for deletion, waiting while the queue is full.
    ///
    /// Returning `Ok` only means the entry was accepted. It is deleted once its batch
    /// commits, or dropped if the process shuts down first.
    pub async fn enqueue(&self, target: DeletionTarget) -> Result<(), EnqueueError> {
        self.tx
            .send(target)
            .await
            .map_err(|err| EnqueueError::Closed(err.0))?;

        counter!(BOOKSHELF_DELETIONS_ENQUEUED_TOTAL, KIND_LABEL => target.kind()).increment(1);
        debug!(kind = target.kind(), id = target.id(), "deletion queued");

        Ok(())
    }

    /// Returns `true` once the batcher has stopped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
