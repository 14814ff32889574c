//! Password reset handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::models::{MessageResponse, NewPasswordRequest, ResetPasswordRequest};

/// Identical for known and unknown emails.
pub const RESET_REQUESTED_MESSAGE: &str = "If this email exists, a reset link has been sent.";

/// `POST /auth/reset-password`: email a reset token if the address is known.
pub async fn reset_password_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<ResetPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    let email = body.email.trim();
    if email.is_empty() {
        return Err(AppError::Validation("email is required".into()));
    }
    state.reset.request_reset(email).await?;
    Ok(Json(MessageResponse::new(RESET_REQUESTED_MESSAGE)))
}

/// `POST /auth/new-password`: trade a reset token for a new password.
pub async fn new_password_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<NewPasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    if body.reset_token.trim().is_empty() {
        return Err(AppError::Validation("reset token is required".into()));
    }
    state
        .reset
        .set_new_password(body.reset_token.trim(), &body.new_password)
        .await?;
    Ok(Json(MessageResponse::new("password updated successfully")))
}
