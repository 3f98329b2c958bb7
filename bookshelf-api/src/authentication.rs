use actix_web::dev::ServiceRequest;
use actix_web::http::StatusCode;
use actix_web::http::header::ContentType;
use actix_web::web::Data;
use actix_web::{HttpMessage, HttpResponse, ResponseError};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use thiserror::Error;
use tracing::debug;

use crate::auth::TokenError;
use crate::routes::ErrorMessage;
use crate::session::SessionService;

/// Id of the user a request was authenticated as, stored in the request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub i64);

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("authentication is not configured")]
    MissingSessionService,
}

impl ResponseError for AuthorizationError {
    fn status_code(&self) -> StatusCode {
        match self {
            AuthorizationError::Token(TokenError::Malformed) => StatusCode::BAD_REQUEST,
            AuthorizationError::Token(TokenError::InvalidSignature | TokenError::Expired) => {
                StatusCode::UNAUTHORIZED
            }
            AuthorizationError::Token(TokenError::Signing(_))
            | AuthorizationError::MissingSessionService => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AuthorizationError::Token(TokenError::Signing(_))
            | AuthorizationError::MissingSessionService => "internal server error".to_string(),
            e => e.to_string(),
        };
        let body = serde_json::to_string(&ErrorMessage { error: message })
            .unwrap_or_else(|_| r#"{"error":"internal server error"}"#.to_string());

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(body)
    }
}

/// Validates the bearer token of every request in the protected scope.
///
/// On success the caller's id is available to handlers as [`AuthenticatedUser`].
pub async fn auth_validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let Some(session) = req.app_data::<Data<SessionService>>() else {
        return Err((AuthorizationError::MissingSessionService.into(), req));
    };

    match session.authenticate(credentials.token()) {
        Ok(user_id) => {
            req.extensions_mut().insert(AuthenticatedUser(user_id));
            Ok(req)
        }
        Err(err) => {
            debug!(error = %err, path = req.path(), "bearer token rejected");
            Err((AuthorizationError::from(err).into(), req))
        }
    }
}
