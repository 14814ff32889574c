//! Authentication request handlers.

use axum::extract::State;
use axum::{Extension, Json};
use axum_extra::extract::CookieJar;
use itschool_core::auth::AuthError;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::extract::ValidJson;
use crate::middleware::auth::AuthenticatedUser;
use crate::models::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MeResponse, MessageResponse,
    RefreshResponse,
};
use crate::services::cookies::{SESSION_COOKIE, clear_session_cookie, session_cookie};

fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_owned())
}

/// `POST /auth/login`: authenticate with email + password, set the session
/// cookie and return an access token.
pub async fn login_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidJson(body): ValidJson<LoginRequest>,
) -> AppResult<(CookieJar, Json<LoginResponse>)> {
    if body.email.trim().is_empty() || body.password.is_empty() {
        return Err(AppError::Validation("email and password are required".into()));
    }

    let out = state.auth.login(body.email.trim(), &body.password).await?;
    let jar = jar.add(session_cookie(
        &out.session.refresh_token,
        out.session.expires_at,
    ));
    Ok((
        jar,
        Json(LoginResponse {
            token: out.access_token.token,
            role: out.role_name,
            expires: out.access_token.expires_at.timestamp(),
        }),
    ))
}

/// `POST /auth/logout`: delete the session named by the cookie and clear it.
pub async fn logout_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    match state.auth.logout(session_token(&jar).as_deref()).await {
        Ok(()) => {}
        Err(AuthError::NoSessionToken) => {
            return Err(AppError::BadRequest("no session token".into()));
        }
        Err(e) => return Err(e.into()),
    }
    Ok((
        jar.add(clear_session_cookie()),
        Json(MessageResponse::new("successfully logged out")),
    ))
}

/// `POST /auth/refresh`: rotate the session's refresh token and return a new
/// access token.
pub async fn refresh_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<RefreshResponse>)> {
    let out = state.auth.refresh(session_token(&jar).as_deref()).await?;
    let jar = jar.add(session_cookie(&out.refresh_token, out.session_expires_at));
    Ok((
        jar,
        Json(RefreshResponse {
            token: out.access_token.token,
            expires: out.access_token.expires_at.timestamp(),
        }),
    ))
}

/// `POST /auth/change-password`
pub async fn change_password_handler(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    ValidJson(body): ValidJson<ChangePasswordRequest>,
) -> AppResult<Json<MessageResponse>> {
    state
        .auth
        .change_password(user.user_id, &body.current_password, &body.new_password)
        .await
        .map_err(|e| match e {
            // The caller is already authenticated; a wrong current password
            // is a bad request, not a login failure.
            AuthError::WrongPassword => {
                AppError::Validation("current password is incorrect".into())
            }
            other => other.into(),
        })?;
    Ok(Json(MessageResponse::new("password updated successfully")))
}

/// `GET /auth/me`: the identity the authenticator attached to this request.
pub async fn me_handler(Extension(user): Extension<AuthenticatedUser>) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        role: user.role.name.clone(),
        role_id: user.role.id,
        permissions: user
            .role
            .permissions
            .granted()
            .into_iter()
            .map(|c| c.to_string())
            .collect(),
        session_auth: user.session_auth,
    })
}
