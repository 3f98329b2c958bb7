//! Logging and metrics setup shared by the bookshelf binaries and tests.

pub mod metrics;
pub mod tracing;
