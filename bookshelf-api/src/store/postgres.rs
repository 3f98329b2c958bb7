use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use bookshelf_postgres::error::{is_foreign_key_violation, is_unique_violation};
use sqlx::PgPool;
use tracing::{debug, warn};

use crate::db;
use crate::store::{Book, DeletionTarget, NewBook, Store, StoreError, User, UserRecord};

/// [`Store`] backed by the `app` schema of a Postgres database.
///
/// Every call, including the wait for a pooled connection, is bounded by
/// `operation_timeout`. Multi-row writes run inside a single transaction.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    operation_timeout: Duration,
}

impl PostgresStore {
    pub fn new(pool: PgPool, operation_timeout: Duration) -> Self {
        Self {
            pool,
            operation_timeout,
        }
    }

    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>> + Send,
    {
        match tokio::time::timeout(self.operation_timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.operation_timeout.as_millis() as u64,
                    "storage operation timed out"
                );
                Err(StoreError::Timeout(self.operation_timeout))
            }
        }
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.bounded("list_users", async {
            db::users::list_users(&self.pool)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.bounded("find_user_by_id", async {
            db::users::read_user(&self.pool, id)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        self.bounded("find_user_by_login", async {
            db::users::read_user_by_login(&self.pool, login)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn insert_user(&self, user: UserRecord) -> Result<i64, StoreError> {
        self.bounded("insert_user", async {
            db::users::create_user(&self.pool, &user)
                .await
                .map_err(|err| {
                    if is_unique_violation(&err) {
                        StoreError::DuplicateLogin(user.login.clone())
                    } else {
                        StoreError::Database(err)
                    }
                })
        })
        .await
    }

    async fn update_user(&self, id: i64, user: UserRecord) -> Result<Option<i64>, StoreError> {
        self.bounded("update_user", async {
            db::users::update_user(&self.pool, id, &user)
                .await
                .map_err(|err| {
                    if is_unique_violation(&err) {
                        StoreError::DuplicateLogin(user.login.clone())
                    } else {
                        StoreError::Database(err)
                    }
                })
        })
        .await
    }

    async fn list_books(&self) -> Result<Vec<Book>, StoreError> {
        self.bounded("list_books", async {
            db::books::list_books(&self.pool)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn list_books_by_owner(&self, owner_id: i64) -> Result<Vec<Book>, StoreError> {
        self.bounded("list_books_by_owner", async {
            db::books::list_books_by_owner(&self.pool, owner_id)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn find_book(&self, id: i64) -> Result<Option<Book>, StoreError> {
        self.bounded("find_book", async {
            db::books::read_book(&self.pool, id)
                .await
                .map_err(StoreError::from)
        })
        .await
    }

    async fn insert_books(
        &self,
        owner_id: i64,
        books: Vec<NewBook>,
    ) -> Result<Vec<i64>, StoreError> {
        self.bounded("insert_books", async {
            let mut txn = self.pool.begin().await?;

            let mut ids = Vec::with_capacity(books.len());
            for book in &books {
                let id = db::books::create_book(&mut *txn, owner_id, &book.title, &book.author)
                    .await
                    .map_err(|err| {
                        if is_foreign_key_violation(&err) {
                            StoreError::UnknownOwner(owner_id)
                        } else {
                            StoreError::Database(err)
                        }
                    })?;
                ids.push(id);
            }

            txn.commit().await?;

            Ok::<_, StoreError>(ids)
        })
        .await
    }

    async fn delete_batch(&self, targets: &[DeletionTarget]) -> Result<u64, StoreError> {
        let mut user_ids = Vec::new();
        let mut book_ids = Vec::new();
        for target in targets {
            match *target {
                DeletionTarget::User(id) => user_ids.push(id),
                DeletionTarget::Book(id) => book_ids.push(id),
            }
        }

        self.bounded("delete_batch", async {
            let mut txn = self.pool.begin().await?;

            let mut deleted = 0;
            if !book_ids.is_empty() {
                deleted += db::books::delete_books(&mut *txn, &book_ids).await?;
            }
            if !user_ids.is_empty() {
                deleted += db::users::delete_users(&mut *txn, &user_ids).await?;
            }

            txn.commit().await?;

            debug!(
                users = user_ids.len(),
                books = book_ids.len(),
                deleted,
                "deletion batch committed"
            );

            Ok::<_, StoreError>(deleted)
        })
        .await
    }
}
