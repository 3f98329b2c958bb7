use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, ResponseError};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::session::SessionError;

pub mod auth;
pub mod books;
pub mod health_check;
pub mod metrics;
pub mod openapi;
pub mod users;

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorMessage {
    #[schema(example = "the user with id 7 was not found")]
    pub error: String,
}

impl ResponseError for SessionError {
    fn status_code(&self) -> StatusCode {
        SessionError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        let error_message = ErrorMessage {
            error: self.to_message(),
        };
        let body =
            serde_json::to_string(&error_message).expect("failed to serialize error message");
        HttpResponse::build(ResponseError::status_code(self))
            .insert_header(ContentType::json())
            .body(body)
    }
}
