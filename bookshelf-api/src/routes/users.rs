use actix_web::web::{Data, Json, Path};
use actix_web::{HttpResponse, Responder, delete, get, put};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::routes::ErrorMessage;
use crate::session::{SessionError, SessionService, UserInput};
use crate::store::User;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    #[schema(example = "Ada King", required = true)]
    #[serde(deserialize_with = "crate::utils::trim_string")]
    pub name: String,
    #[schema(example = "ada", required = true)]
    #[serde(deserialize_with = "crate::utils::trim_string")]
    pub login: String,
    #[schema(example = "difference engine", required = true)]
    pub password: String,
}

/// A user as exposed over HTTP, without its password hash.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadUserResponse {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    #[schema(example = "ada")]
    pub login: String,
}

impl From<User> for ReadUserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            login: user.login,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadUsersResponse {
    pub users: Vec<ReadUserResponse>,
}

#[utoipa::path(
    summary = "List users",
    responses(
        (status = 200, description = "Users listed successfully", body = ReadUsersResponse),
        (status = 401, description = "Unauthorized", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Users"
)]
#[get("/users")]
pub async fn read_all_users(session: Data<SessionService>) -> Result<impl Responder, SessionError> {
    let users = session
        .list_users()
        .await?
        .into_iter()
        .map(ReadUserResponse::from)
        .collect();

    Ok(Json(ReadUsersResponse { users }))
}

#[utoipa::path(
    summary = "Retrieve a user",
    params(
        ("user_id" = i64, Path, description = "Unique ID of the user")
    ),
    responses(
        (status = 200, description = "User retrieved successfully", body = ReadUserResponse),
        (status = 404, description = "User not found", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Users"
)]
#[get("/users/{user_id}")]
pub async fn read_user(
    session: Data<SessionService>,
    user_id: Path<i64>,
) -> Result<impl Responder, SessionError> {
    let user = session.read_user(user_id.into_inner()).await?;

    Ok(Json(ReadUserResponse::from(user)))
}

#[utoipa::path(
    summary = "Update a user",
    description = "Replaces name, login and password of a user.",
    request_body = UpdateUserRequest,
    params(
        ("user_id" = i64, Path, description = "Unique ID of the user")
    ),
    responses(
        (status = 200, description = "User updated successfully"),
        (status = 400, description = "Bad request", body = ErrorMessage),
        (status = 404, description = "User not found", body = ErrorMessage),
        (status = 409, description = "Login already taken", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Users"
)]
#[put("/users/{user_id}")]
pub async fn update_user(
    session: Data<SessionService>,
    user_id: Path<i64>,
    request: Json<UpdateUserRequest>,
) -> Result<impl Responder, SessionError> {
    let request = request.into_inner();

    session
        .update_user(
            user_id.into_inner(),
            UserInput {
                name: request.name,
                login: request.login,
                password: request.password,
            },
        )
        .await?;

    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    summary = "Delete a user",
    description = "Queues a user and its books for deletion. The deletion is applied once enough deletions are queued to fill a batch.",
    params(
        ("user_id" = i64, Path, description = "Unique ID of the user")
    ),
    responses(
        (status = 202, description = "User queued for deletion"),
        (status = 404, description = "User not found", body = ErrorMessage),
        (status = 503, description = "Deletions unavailable", body = ErrorMessage)
    ),
    tag = "Users"
)]
#[delete("/users/{user_id}")]
pub async fn delete_user(
    session: Data<SessionService>,
    user_id: Path<i64>,
) -> Result<impl Responder, SessionError> {
    session.request_user_deletion(user_id.into_inner()).await?;

    Ok(HttpResponse::Accepted().finish())
}
