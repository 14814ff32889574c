//! Authentication middleware: bearer token or session cookie.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use itschool_core::auth::authenticator::{Identity, RequestCredentials};
use itschool_core::auth::{AuthError, gate};
use itschool_core::models::auth::Role;
use uuid::Uuid;

use crate::AppState;
use crate::error::AppError;
use crate::services::cookies::SESSION_COOKIE;

/// Resolved caller, stored in request extensions.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub role: Role,
    /// True when authenticated through the session cookie.
    pub session_auth: bool,
}

impl AuthenticatedUser {
    /// Check that the caller may write a record of `kind` ("lesson",
    /// "freeze", "prolongation"). For handlers whose route gate is broader
    /// than the record they write.
    pub fn require_record_kind(&self, kind: &str) -> Result<(), AppError> {
        gate::authorize_record_kind(&self.role, kind).map_err(AppError::from)
    }
}

impl From<Identity> for AuthenticatedUser {
    fn from(identity: Identity) -> Self {
        Self {
            user_id: identity.user_id,
            role: identity.role,
            session_auth: identity.session_auth,
        }
    }
}

/// Axum middleware: resolves the caller from `Authorization` (tried first)
/// or the `session_token` cookie and injects [`AuthenticatedUser`] into
/// request extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // A present but unreadable header still selects the bearer strategy.
    let authorization = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map(str::to_owned).map_err(|_| {
            AuthError::InvalidToken("authorization header is not visible ASCII".into())
        })?),
        None => None,
    };
    let creds = RequestCredentials {
        authorization,
        session_token: jar.get(SESSION_COOKIE).map(|c| c.value().to_owned()),
    };

    let identity = state.authenticator.authenticate(&creds).await?;
    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(identity));

    Ok(next.run(request).await)
}
