use actix_web::web::{Data, Json};
use actix_web::{Responder, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::routes::ErrorMessage;
use crate::session::{SessionError, SessionService, UserInput};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "Ada Lovelace", required = true)]
    #[serde(deserialize_with = "crate::utils::trim_string")]
    pub name: String,
    #[schema(example = "ada", required = true)]
    #[serde(deserialize_with = "crate::utils::trim_string")]
    pub login: String,
    #[schema(example = "analytical engine", required = true)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    #[schema(example = 1)]
    pub id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "ada", required = true)]
    #[serde(deserialize_with = "crate::utils::trim_string")]
    pub login: String,
    #[schema(example = "analytical engine", required = true)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[utoipa::path(
    summary = "Register a user",
    description = "Creates a user and returns a bearer token for it.",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Bad request", body = ErrorMessage),
        (status = 409, description = "Login already taken", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Auth"
)]
#[post("/register")]
pub async fn register(
    session: Data<SessionService>,
    request: Json<RegisterRequest>,
) -> Result<impl Responder, SessionError> {
    let request = request.into_inner();

    let registered = session
        .register(UserInput {
            name: request.name,
            login: request.login,
            password: request.password,
        })
        .await?;

    let response = RegisterResponse {
        id: registered.id,
        token: registered.token.token,
        expires_at: registered.token.expires_at,
    };

    Ok(Json(response))
}

#[utoipa::path(
    summary = "Log in",
    description = "Exchanges a login and password for a bearer token.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in successfully", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ErrorMessage),
        (status = 500, description = "Internal server error", body = ErrorMessage)
    ),
    tag = "Auth"
)]
#[post("/login")]
pub async fn login(
    session: Data<SessionService>,
    request: Json<LoginRequest>,
) -> Result<impl Responder, SessionError> {
    let token = session.login(&request.login, &request.password).await?;

    let response = TokenResponse {
        token: token.token,
        expires_at: token.expires_at,
    };

    Ok(Json(response))
}
