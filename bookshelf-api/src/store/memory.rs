use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::store::{Book, DeletionTarget, NewBook, Store, StoreError, User, UserRecord};

/// Inner state of [`MemoryStore`].
#[derive(Debug, Default)]
struct Inner {
    users: BTreeMap<i64, User>,
    books: BTreeMap<i64, Book>,
    next_user_id: i64,
    next_book_id: i64,
    /// Every batch passed to a successful [`Store::delete_batch`], in commit order.
    committed_batches: Vec<Vec<DeletionTarget>>,
    /// Number of upcoming [`Store::delete_batch`] calls that fail without deleting.
    failing_batches: u32,
}

/// In-memory [`Store`] with the same observable semantics as the Postgres one.
///
/// Ids start at 1, logins are unique and deleting a user also deletes the books it
/// owns. Batch deletions can be made to fail on demand to exercise retry paths.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Makes the next `count` batch deletions fail with a timeout error.
    pub async fn fail_next_batches(&self, count: u32) {
        let mut inner = self.inner.lock().await;
        inner.failing_batches = count;
    }

    /// Returns the batches committed so far.
    pub async fn committed_batches(&self) -> Vec<Vec<DeletionTarget>> {
        let inner = self.inner.lock().await;

        inner.committed_batches.clone()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let inner = self.inner.lock().await;

        Ok(inner.users.values().cloned().collect())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().await;

        Ok(inner.users.get(&id).cloned())
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<User>, StoreError> {
        let inner = self.inner.lock().await;

        Ok(inner.users.values().find(|user| user.login == login).cloned())
    }

    async fn insert_user(&self, user: UserRecord) -> Result<i64, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.users.values().any(|existing| existing.login == user.login) {
            return Err(StoreError::DuplicateLogin(user.login));
        }

        inner.next_user_id += 1;
        let id = inner.next_user_id;
        inner.users.insert(
            id,
            User {
                id,
                name: user.name,
                login: user.login,
                password_hash: user.password_hash,
            },
        );

        Ok(id)
    }

    async fn update_user(&self, id: i64, user: UserRecord) -> Result<Option<i64>, StoreError> {
        let mut inner = self.inner.lock().await;

        if !inner.users.contains_key(&id) {
            return Ok(None);
        }
        if inner
            .users
            .values()
            .any(|existing| existing.id != id && existing.login == user.login)
        {
            return Err(StoreError::DuplicateLogin(user.login));
        }

        inner.users.insert(
            id,
            User {
                id,
                name: user.name,
                login: user.login,
                password_hash: user.password_hash,
            },
        );

        Ok(Some(id))
    }

    async fn list_books(&self) -> Result<Vec<Book>, StoreError> {
        let inner = self.inner.lock().await;

        Ok(inner.books.values().cloned().collect())
    }

    async fn list_books_by_owner(&self, owner_id: i64) -> Result<Vec<Book>, StoreError> {
        let inner = self.inner.lock().await;

        Ok(inner
            .books
            .values()
            .filter(|book| book.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn find_book(&self, id: i64) -> Result<Option<Book>, StoreError> {
        let inner = self.inner.lock().await;

        Ok(inner.books.get(&id).cloned())
    }

    async fn insert_books(
        &self,
        owner_id: i64,
        books: Vec<NewBook>,
    ) -> Result<Vec<i64>, StoreError> {
        let mut inner = self.inner.lock().await;

        if !inner.users.contains_key(&owner_id) {
            return Err(StoreError::UnknownOwner(owner_id));
        }

        let mut ids = Vec::with_capacity(books.len());
        for book in books {
            inner.next_book_id += 1;
            let id = inner.next_book_id;
            inner.books.insert(
                id,
                Book {
                    id,
                    title: book.title,
                    author: book.author,
                    owner_id,
                },
            );
            ids.push(id);
        }

        Ok(ids)
    }

    async fn delete_batch(&self, targets: &[DeletionTarget]) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().await;

        if inner.failing_batches > 0 {
            inner.failing_batches -= 1;
            return Err(StoreError::Timeout(std::time::Duration::ZERO));
        }

        let mut deleted = 0;
        for target in targets {
            match *target {
                DeletionTarget::User(id) => {
                    if inner.users.remove(&id).is_some() {
                        deleted += 1;
                        inner.books.retain(|_, book| book.owner_id != id);
                    }
                }
                DeletionTarget::Book(id) => {
                    if inner.books.remove(&id).is_some() {
                        deleted += 1;
                    }
                }
            }
        }
        inner.committed_batches.push(targets.to_vec());

        Ok(deleted)
    }
}
