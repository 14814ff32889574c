//! User administration handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use itschool_core::auth::accounts::{CreateUser, RoleRef};
use uuid::Uuid;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ValidJson;
use crate::models::{CreateUserRequest, CreateUserResponse};

/// `POST /settings/users`: create an account. Gated by `access_settings`.
pub async fn create_user_handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<CreateUserResponse>)> {
    let role = match body.role.trim().parse::<Uuid>() {
        Ok(id) => RoleRef::Id(id),
        Err(_) => RoleRef::Name(body.role.trim().to_string()),
    };
    let id = state
        .accounts
        .create_user(CreateUser {
            full_name: body.full_name,
            email: body.email,
            password: body.password,
            telephone: body.telephone,
            role,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(CreateUserResponse { id })))
}
