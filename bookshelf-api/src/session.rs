//! Operations behind the HTTP routes.
//!
//! [`SessionService`] ties the credential verifier, the token issuer, storage and the
//! deletion queue together. Handlers stay thin and only translate between JSON and
//! these calls.

use std::sync::Arc;

use actix_web::http::StatusCode;
use thiserror::Error;
use tracing::{debug, info};

use crate::auth::{
    IssuedToken, PasswordError, TokenError, TokenIssuer, hash_password, verify_password,
};
use crate::deletion::{DeletionQueue, DeletionTarget, EnqueueError};
use crate::store::{Book, NewBook, Store, StoreError, User, UserRecord};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),

    /// Unknown login or wrong password. Both look the same to the caller.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("a user with login {0} already exists")]
    LoginTaken(String),

    #[error("the user with id {0} was not found")]
    UserNotFound(i64),

    #[error("the book with id {0} was not found")]
    BookNotFound(i64),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(StoreError),

    #[error(transparent)]
    Enqueue(#[from] EnqueueError),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateLogin(login) => SessionError::LoginTaken(login),
            StoreError::UnknownOwner(id) => SessionError::UserNotFound(id),
            err => SessionError::Store(err),
        }
    }
}

impl SessionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::Validation(_) => StatusCode::BAD_REQUEST,
            SessionError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            SessionError::Token(TokenError::Malformed) => StatusCode::BAD_REQUEST,
            SessionError::Token(TokenError::InvalidSignature | TokenError::Expired) => {
                StatusCode::UNAUTHORIZED
            }
            SessionError::Token(TokenError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            SessionError::LoginTaken(_) => StatusCode::CONFLICT,
            SessionError::UserNotFound(_) | SessionError::BookNotFound(_) => StatusCode::NOT_FOUND,
            SessionError::Password(_) | SessionError::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            SessionError::Enqueue(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn to_message(&self) -> String {
        match self {
            // Do not expose internal details in error messages
            SessionError::Store(err) if err.is_internal() => "internal server error".to_string(),
            SessionError::Password(_) | SessionError::Token(TokenError::Signing(_)) => {
                "internal server error".to_string()
            }
            SessionError::Enqueue(_) => "deletions are temporarily unavailable".to_string(),
            e => e.to_string(),
        }
    }
}

/// A newly registered user together with its first token.
#[derive(Debug)]
pub struct RegisteredUser {
    pub id: i64,
    pub token: IssuedToken,
}

/// Fields accepted when creating or replacing a user.
#[derive(Debug)]
pub struct UserInput {
    pub name: String,
    pub login: String,
    pub password: String,
}

impl UserInput {
    fn validate(&self) -> Result<(), SessionError> {
        if self.name.is_empty() {
            return Err(SessionError::Validation("name must not be empty".to_string()));
        }
        if self.login.is_empty() {
            return Err(SessionError::Validation("login must not be empty".to_string()));
        }
        if self.password.is_empty() {
            return Err(SessionError::Validation(
                "password must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    async fn into_record(self, cost: u32) -> Result<UserRecord, SessionError> {
        let password_hash = hash_password(&self.password, cost).await?;

        Ok(UserRecord {
            name: self.name,
            login: self.login,
            password_hash: password_hash.into_string(),
        })
    }
}

fn validate_book(book: &NewBook) -> Result<(), SessionError> {
    if book.title.is_empty() {
        return Err(SessionError::Validation("title must not be empty".to_string()));
    }
    if book.author.is_empty() {
        return Err(SessionError::Validation("author must not be empty".to_string()));
    }

    Ok(())
}

pub struct SessionService {
    store: Arc<dyn Store>,
    tokens: TokenIssuer,
    deletions: DeletionQueue,
    password_hash_cost: u32,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: TokenIssuer,
        deletions: DeletionQueue,
        password_hash_cost: u32,
    ) -> Self {
        Self {
            store,
            tokens,
            deletions,
            password_hash_cost,
        }
    }

    /// Creates a user and signs it in right away.
    pub async fn register(&self, input: UserInput) -> Result<RegisteredUser, SessionError> {
        input.validate()?;
        let record = input.into_record(self.password_hash_cost).await?;

        let id = self.store.insert_user(record).await?;
        let token = self.tokens.issue(id)?;
        info!(user_id = id, "user registered");

        Ok(RegisteredUser { id, token })
    }

    pub async fn login(&self, login: &str, password: &str) -> Result<IssuedToken, SessionError> {
        let Some(user) = self.store.find_user_by_login(login).await? else {
            debug!("login rejected: unknown login");
            return Err(SessionError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash).await {
            debug!(user_id = user.id, "login rejected: wrong password");
            return Err(SessionError::InvalidCredentials);
        }

        let token = self.tokens.issue(user.id)?;
        info!(user_id = user.id, "user logged in");

        Ok(token)
    }

    /// Resolves a bearer token to the id of the user it was issued for.
    pub fn authenticate(&self, token: &str) -> Result<i64, TokenError> {
        self.tokens.validate(token)
    }

    pub async fn list_users(&self) -> Result<Vec<User>, SessionError> {
        Ok(self.store.list_users().await?)
    }

    pub async fn read_user(&self, user_id: i64) -> Result<User, SessionError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(SessionError::UserNotFound(user_id))
    }

    /// Replaces name, login and password of `user_id`.
    pub async fn update_user(&self, user_id: i64, input: UserInput) -> Result<i64, SessionError> {
        input.validate()?;
        let record = input.into_record(self.password_hash_cost).await?;

        self.store
            .update_user(user_id, record)
            .await?
            .ok_or(SessionError::UserNotFound(user_id))
    }

    pub async fn list_books(&self) -> Result<Vec<Book>, SessionError> {
        Ok(self.store.list_books().await?)
    }

    pub async fn list_books_of(&self, owner_id: i64) -> Result<Vec<Book>, SessionError> {
        Ok(self.store.list_books_by_owner(owner_id).await?)
    }

    /// Saves a book owned by `owner_id`.
    pub async fn save_book(&self, owner_id: i64, book: NewBook) -> Result<i64, SessionError> {
        let mut ids = self.save_books(owner_id, vec![book]).await?;

        ids.pop()
            .ok_or_else(|| SessionError::Validation("no book was saved".to_string()))
    }

    /// Saves all `books` for `owner_id`, either every one of them or none.
    pub async fn save_books(
        &self,
        owner_id: i64,
        books: Vec<NewBook>,
    ) -> Result<Vec<i64>, SessionError> {
        if books.is_empty() {
            return Err(SessionError::Validation(
                "at least one book is required".to_string(),
            ));
        }
        for book in &books {
            validate_book(book)?;
        }

        let ids = self.store.insert_books(owner_id, books).await?;
        info!(owner_id, count = ids.len(), "books saved");

        Ok(ids)
    }

    /// Queues `user_id` for deletion. The user and its books disappear once the batch
    /// holding this request commits.
    pub async fn request_user_deletion(&self, user_id: i64) -> Result<(), SessionError> {
        if self.store.find_user_by_id(user_id).await?.is_none() {
            return Err(SessionError::UserNotFound(user_id));
        }

        self.deletions.enqueue(DeletionTarget::User(user_id)).await?;

        Ok(())
    }

    /// Queues `book_id` for deletion.
    pub async fn request_book_deletion(&self, book_id: i64) -> Result<(), SessionError> {
        if self.store.find_book(book_id).await?.is_none() {
            return Err(SessionError::BookNotFound(book_id));
        }

        self.deletions.enqueue(DeletionTarget::Book(book_id)).await?;

        Ok(())
    }
}
