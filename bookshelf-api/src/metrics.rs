//! Names and labels of the metrics emitted by the API.

pub const BOOKSHELF_DELETIONS_ENQUEUED_TOTAL: &str = "bookshelf_deletions_enqueued_total";
pub const BOOKSHELF_DELETION_BATCHES_FLUSHED_TOTAL: &str = "bookshelf_deletion_batches_flushed_total";
pub const BOOKSHELF_DELETION_FLUSH_FAILURES_TOTAL: &str = "bookshelf_deletion_flush_failures_total";
/// Entries drained from the queue that wait for their batch to fill up.
pub const BOOKSHELF_DELETION_PENDING: &str = "bookshelf_deletion_pending";

/// Entity kind of a deletion, `user` or `book`.
pub const KIND_LABEL: &str = "kind";
