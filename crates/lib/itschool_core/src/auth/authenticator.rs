//! Per-request identity resolution.
//!
//! Two strategies are tried in a fixed order: a bearer access token from the
//! `Authorization` header, then the `session_token` cookie. The first
//! strategy whose credential is present decides the outcome; a bad bearer
//! token is not retried as a cookie.

use tracing::{debug, warn};
use uuid::Uuid;

use super::{AuthContext, AuthError};
use crate::models::auth::Role;

/// Raw credentials lifted off a request.
#[derive(Debug, Clone, Default)]
pub struct RequestCredentials {
    /// `Authorization` header value, verbatim.
    pub authorization: Option<String>,
    /// `session_token` cookie value.
    pub session_token: Option<String>,
}

/// One way of turning request credentials into a user id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    BearerToken,
    SessionCookie,
}

impl Strategy {
    /// Evaluation order. Bearer tokens win over cookies.
    pub const ORDER: [Strategy; 2] = [Strategy::BearerToken, Strategy::SessionCookie];

    /// Whether this strategy's credential is present on the request.
    pub fn applies(self, creds: &RequestCredentials) -> bool {
        match self {
            Strategy::BearerToken => creds.authorization.is_some(),
            Strategy::SessionCookie => creds
                .session_token
                .as_deref()
                .is_some_and(|t| !t.is_empty()),
        }
    }
}

/// The resolved caller.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user_id: Uuid,
    pub role: Role,
    /// True when resolved from the session cookie rather than a bearer token.
    pub session_auth: bool,
}

/// Resolves [`Identity`] from request credentials. Every call hits the store;
/// nothing is cached.
#[derive(Clone)]
pub struct RequestAuthenticator {
    ctx: AuthContext,
}

impl RequestAuthenticator {
    pub fn new(ctx: AuthContext) -> Self {
        Self { ctx }
    }

    pub async fn authenticate(&self, creds: &RequestCredentials) -> Result<Identity, AuthError> {
        let Some(strategy) = Strategy::ORDER.into_iter().find(|s| s.applies(creds)) else {
            return Err(AuthError::NoSessionToken);
        };

        let user_id = match strategy {
            Strategy::BearerToken => self.from_bearer(creds.authorization.as_deref().unwrap_or(""))?,
            Strategy::SessionCookie => {
                self.from_session(creds.session_token.as_deref().unwrap_or(""))
                    .await?
            }
        };

        let user = self
            .ctx
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound(user_id))?;
        let role = self.ctx.resolve_role(user.role_id).await?;

        debug!(%user_id, role = %role.name, ?strategy, "request authenticated");
        Ok(Identity {
            user_id,
            role,
            session_auth: strategy == Strategy::SessionCookie,
        })
    }

    fn from_bearer(&self, header: &str) -> Result<Uuid, AuthError> {
        let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
        let claims = self
            .ctx
            .issuer
            .verify_access_token(token, self.ctx.clock.now())?;
        claims
            .user_id()
            .ok_or_else(|| AuthError::InvalidToken("subject is not a user id".into()))
    }

    /// Expired sessions found here are deleted. A failed delete is logged and
    /// the request is still rejected.
    async fn from_session(&self, refresh_token: &str) -> Result<Uuid, AuthError> {
        let found = self
            .ctx
            .sessions
            .find_session(refresh_token)
            .await?
            .ok_or(AuthError::InvalidSessionToken)?;

        if found.session.is_expired_at(self.ctx.clock.now()) {
            let user_id = found.session.user_id;
            match self.ctx.sessions.delete_session(refresh_token).await {
                Ok(_) => debug!(%user_id, "expired session removed"),
                Err(e) => warn!(%user_id, error = %e, "failed to remove expired session"),
            }
            return Err(AuthError::InvalidSessionToken);
        }

        Ok(found.session.user_id)
    }
}
