//! Liveness and fallback endpoints.

use axum::Json;

use crate::error::AppError;
use crate::models::MessageResponse;

/// `GET /`: always answers while the process is serving.
pub async fn health_check() -> Json<MessageResponse> {
    Json(MessageResponse::new("Server is running!"))
}

/// Fallback for unmatched paths.
pub async fn not_found() -> AppError {
    AppError::NotFound("no such route".into())
}
