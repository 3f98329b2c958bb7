//! Postgres plumbing shared by the bookshelf services: pool construction, error
//! classification and throwaway databases for tests.

pub mod error;
pub mod pool;
#[cfg(feature = "test-utils")]
pub mod sqlx;
