use actix_web::web::{Data, Json, Path, ReqData};
use actix_web::{HttpResponse, Responder, delete, get, post};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::authentication::AuthenticatedUser;
use crate::routes::ErrorMessage;
use crate::session::{SessionError, SessionService};
use crate::store::{Book, NewBook};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateBookRequest {
    #[schema(example = "Sketch of the Analytical Engine", required = true)]
    #[serde(deserialize_with = "crate::utils::trim_string")]
    pub title: String,
    #[schema(example = "Luigi Menabrea", required = true)]
    #[serde(deserialize_with = "crate::utils::trim_string")]
    pub author: String,
}

impl From<CreateBookRequest> for NewBook {
    fn from(request: CreateBookRequest) -> Self {
        NewBook {
            title: request.title,
            author: request.author,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateBookResponse {
    #[schema(example = 1)]
    pub id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateBooksRequest {
    pub books: Vec<CreateBookRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateBooksResponse {
    pub ids: Vec<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadBookResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Sketch of the Analytical Engine")]
    pub title: String,
    #[schema(example = "Luigi Menabrea")]
    pub author: String,
    #[schema(example = 1)]
    pub owner_id: i64,
}

impl From<Book> for ReadBookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            author: book.author,
            owner_id: book.owner_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadBooksResponse {
    pub books: Vec<ReadBookResponse>,
}

impl From<Vec<Book>> for ReadBooksResponse {
    fn from(books: Vec<Book>) -> Self {
        Self {
            books: books.into_iter().map(ReadBookResponse::from).collect(),
        }
    }
}

#[utoipa::path(
    summary = "List books",
    responses(
        (status = 200, description = "Books listed successfully", body = ReadBooksResponse),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Books"
)]
#[get("/books")]
pub async fn read_all_books(session: Data<SessionService>) -> Result<impl Responder, SessionError> {
    let books = session.list_books().await?;

    Ok(Json(ReadBooksResponse::from(books)))
}

#[utoipa::path(
    summary = "List own books",
    description = "Returns the books saved by the authenticated user.",
    responses(
        (status = 200, description = "Books listed successfully", body = ReadBooksResponse),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Books"
)]
#[get("/books/mine")]
pub async fn read_my_books(
    session: Data<SessionService>,
    user: ReqData<AuthenticatedUser>,
) -> Result<impl Responder, SessionError> {
    let books = session.list_books_of(user.0).await?;

    Ok(Json(ReadBooksResponse::from(books)))
}

#[utoipa::path(
    summary = "Save a book",
    description = "Saves a book owned by the authenticated user.",
    request_body = CreateBookRequest,
    responses(
        (status = 200, description = "Book saved successfully", body = CreateBookResponse),
        (status = 400, description = "Bad request", body = ErrorMessage),
        (status = 404, description = "Owner not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Books"
)]
#[post("/books")]
pub async fn create_book(
    session: Data<SessionService>,
    user: ReqData<AuthenticatedUser>,
    book: Json<CreateBookRequest>,
) -> Result<impl Responder, SessionError> {
    let id = session.save_book(user.0, book.into_inner().into()).await?;

    Ok(Json(CreateBookResponse { id }))
}

#[utoipa::path(
    summary = "Save several books",
    description = "Saves all books for the authenticated user in one transaction, either all of them or none.",
    request_body = CreateBooksRequest,
    responses(
        (status = 200, description = "Books saved successfully", body = CreateBooksResponse),
        (status = 400, description = "Bad request", body = ErrorMessage),
        (status = 404, description = "Owner not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Books"
)]
#[post("/books/batch")]
pub async fn create_books(
    session: Data<SessionService>,
    user: ReqData<AuthenticatedUser>,
    request: Json<CreateBooksRequest>,
) -> Result<impl Responder, SessionError> {
    let books = request
        .into_inner()
        .books
        .into_iter()
        .map(NewBook::from)
        .collect();
    let ids = session.save_books(user.0, books).await?;

    Ok(Json(CreateBooksResponse { ids }))
}

#[utoipa::path(
    summary = "Delete a book",
    description = "Queues a book for deletion. The deletion is applied once enough deletions are queued to fill a batch.",
    params(
        ("book_id" = i64, Path, description = "Unique ID of the book")
    ),
    responses(
        (status = 202, description = "Book queued for deletion"),
        (status = 404, description = "Book not found", body = ErrorMessage),
        (status = 503, description = "Deletions unavailable", body = ErrorMessage)
    ),
    tag = "Books"
)]
#[delete("/books/{book_id}")]
pub async fn delete_book(
    session: Data<SessionService>,
    book_id: Path<i64>,
) -> Result<impl Responder, SessionError> {
    session.request_book_deletion(book_id.into_inner()).await?;

    Ok(HttpResponse::Accepted().finish())
}
