//! Batched removal of users and books.
//!
//! Delete requests do not touch storage. They push a [`DeletionTarget`] into a bounded
//! [`DeletionQueue`] and return. A single [`DeletionBatcher`] task drains the queue and
//! commits the entries in batches of exactly `batch_size`, each batch in one storage
//! transaction.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::concurrency::shutdown::ShutdownRx;
use crate::config::DeletionConfig;
use crate::store::Store;

mod batcher;
mod queue;

pub use crate::store::DeletionTarget;
pub use batcher::{BatchFlushError, DeletionBatcher, DeletionBatcherHandle};
pub use queue::{DeletionQueue, EnqueueError};

/// Creates a connected queue and batcher.
///
/// The queue holds at most `config.batch_size` entries not yet picked up by the
/// batcher, further [`DeletionQueue::enqueue`] calls wait for room.
pub fn deletion_batcher(
    store: Arc<dyn Store>,
    config: DeletionConfig,
    shutdown_rx: ShutdownRx,
) -> (DeletionQueue, DeletionBatcher) {
    let (tx, rx) = mpsc::channel(config.batch_size.max(1));

    (
        DeletionQueue::new(tx),
        DeletionBatcher::new(store, config, rx, shutdown_rx),
    )
}
