//! Persistence of users and books.
//!
//! Request handlers and the deletion batcher only see the [`Store`] trait. The
//! production implementation lives in [`postgres`], [`memory`] backs the tests.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod memory;
pub mod postgres;

/// A stored principal. `password_hash` never leaves the service.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub login: String,
    pub password_hash: String,
}

/// User fields written on insert and on update.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub name: String,
    pub login: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub owner_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub author: String,
}

/// An entity queued for batched removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletionTarget {
    User(i64),
    Book(i64),
}

impl DeletionTarget {
    pub fn kind(&self) -> &'static str {
        match self {
            DeletionTarget::User(_) => "user",
            DeletionTarget::Book(_) => "book",
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            DeletionTarget::User(id) | DeletionTarget::Book(id) => *id,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Error while interacting with Postgres: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage operation did not complete within {0:?}")]
    Timeout(Duration),

    #[error("A user with login {0} already exists")]
    DuplicateLogin(String),

    #[error("The user with id {0} was not found")]
    UnknownOwner(i64),
}

impl StoreError {
    /// Returns `true` for failures whose details must not reach API clients.
    pub fn is_internal(&self) -> bool {
        matches!(self, StoreError::Database(_) | StoreError::Timeout(_))
    }
}

/// Storage collaborator shared by request handlers and the deletion batcher.
#[async_trait]
pub trait Store: Send + Sync {
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError>;

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError>;

    /// Inserts a user and returns its assigned id.
    ///
    /// Fails with [`StoreError::DuplicateLogin`] when the login is taken.
    async fn insert_user(&self, user: UserRecord) -> Result<i64, StoreError>;

    /// Replaces the fields of user `id`. Returns `None` when no such user exists.
    async fn update_user(&self, id: i64, user: UserRecord) -> Result<Option<i64>, StoreError>;

    async fn list_books(&self) -> Result<Vec<Book>, StoreError>;

    async fn list_books_by_owner(&self, owner_id: i64) -> Result<Vec<Book>, StoreError>;

    async fn find_book(&self, id: i64) -> Result<Option<Book>, StoreError>;

    /// Inserts all `books` for `owner_id` atomically and returns their ids in input order.
    async fn insert_books(&self, owner_id: i64, books: Vec<NewBook>)
    -> Result<Vec<i64>, StoreError>;

    /// Removes exactly the given targets in one transaction and returns the number of
    /// rows deleted. Targets that no longer exist are skipped.
    async fn delete_batch(&self, targets: &[DeletionTarget]) -> Result<u64, StoreError>;
}
