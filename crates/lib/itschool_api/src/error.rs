//! Application error types.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use itschool_core::auth::AuthError;
use thiserror::Error;
use tracing::{debug, error};

use crate::models::ErrorResponse;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            AppError::Validation(m) => (StatusCode::BAD_REQUEST, "validation_error", m.as_str()),
            AppError::BadRequest(m) => (StatusCode::BAD_REQUEST, "bad_request", m.as_str()),
            AppError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, "unauthorized", m.as_str()),
            AppError::Forbidden(m) => (StatusCode::FORBIDDEN, "forbidden", m.as_str()),
            AppError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m.as_str()),
            AppError::Internal(detail) => {
                error!(%detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                )
            }
        };
        let body = Json(ErrorResponse {
            error: error.to_string(),
            message: message.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "rejected request body");
        AppError::BadRequest("malformed request body".into())
    }
}

/// Several internal kinds map to one external kind on purpose: clients must
/// not learn whether an email exists or which token check failed.
impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::UnknownEmail | AuthError::WrongPassword => {
                AppError::Unauthorized("invalid credentials".into())
            }
            AuthError::NoSessionToken
            | AuthError::InvalidSessionToken
            | AuthError::ExpiredSessionToken
            | AuthError::InvalidToken(_)
            | AuthError::UserNotFound(_) => AppError::Unauthorized("not authenticated".into()),
            AuthError::ResetTokenUnknown | AuthError::ResetTokenExpired => {
                AppError::Unauthorized("invalid or expired reset token".into())
            }
            AuthError::Forbidden(capability) => {
                AppError::Forbidden(format!("requires {capability}"))
            }
            AuthError::Validation(msg) => AppError::Validation(msg),
            AuthError::EmailTaken => AppError::Validation("email already registered".into()),
            AuthError::RoleResolution(_)
            | AuthError::Signing(_)
            | AuthError::RandomSource(_)
            | AuthError::MissingIdentity
            | AuthError::Hashing(_)
            | AuthError::EmailDispatch(_)
            | AuthError::Store(_) => AppError::Internal(e.to_string()),
        }
    }
}
