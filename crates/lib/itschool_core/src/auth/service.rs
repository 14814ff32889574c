//! Login, refresh and logout flows.
//!
//! Each flow composes the credential, role and session stores with the token
//! issuer. Every store write is a single statement, so a flow abandoned
//! mid-way (client disconnect) never leaves a half-written session.

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::issuer::AccessToken;
use super::{AuthContext, AuthError};
use crate::models::auth::Session;

/// Session (refresh token) lifetime: 7 days.
pub const SESSION_EXPIRY_DAYS: i64 = 7;

/// Longest password bcrypt accepts, in bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub role_name: String,
    pub access_token: AccessToken,
    pub session: Session,
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub user_id: Uuid,
    pub access_token: AccessToken,
    pub refresh_token: String,
    pub session_expires_at: DateTime<Utc>,
}

/// Reject empty or over-long passwords before hashing.
pub fn validate_new_password(password: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::Validation("password must not be empty".into()));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(AuthError::Validation(format!(
            "password must be at most {MAX_PASSWORD_BYTES} bytes"
        )));
    }
    Ok(())
}

/// Compared against on unknown-email logins so they cost one bcrypt
/// verification like any other attempt.
const DECOY_PASSWORD: &str = "decoy-password-never-issued";

/// Login / refresh / logout / password change.
#[derive(Clone)]
pub struct AuthService {
    ctx: AuthContext,
    decoy_hash: Arc<OnceLock<String>>,
}

impl AuthService {
    pub fn new(ctx: AuthContext) -> Self {
        Self {
            ctx,
            decoy_hash: Arc::default(),
        }
    }

    /// Hash of [`DECOY_PASSWORD`] at the configured cost, built on first use.
    fn decoy_hash(&self) -> Option<&str> {
        if let Some(hash) = self.decoy_hash.get() {
            return Some(hash);
        }
        match self.ctx.hasher.hash(DECOY_PASSWORD) {
            Ok(hash) => Some(self.decoy_hash.get_or_init(|| hash)),
            Err(e) => {
                warn!(error = %e, "could not build decoy password hash");
                None
            }
        }
    }

    fn session_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(SESSION_EXPIRY_DAYS)
    }

    /// Authenticate with email + password and open a session, replacing any
    /// session the user already had.
    ///
    /// An unknown email and a wrong password are distinct errors here; the
    /// HTTP layer reports both as the same "invalid credentials". Both pay
    /// for one password verification.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let Some(user) = self.ctx.users.find_user_by_email(email).await? else {
            if let Some(hash) = self.decoy_hash() {
                let _ = self.ctx.hasher.verify(password, hash);
            }
            info!("login attempt with unknown email");
            return Err(AuthError::UnknownEmail);
        };

        if !self.ctx.hasher.verify(password, &user.password_hash)? {
            warn!(user_id = %user.id, "login attempt with wrong password");
            return Err(AuthError::WrongPassword);
        }

        let role = self.ctx.resolve_role(user.role_id).await?;

        let now = self.ctx.clock.now();
        let access_token = self
            .ctx
            .issuer
            .issue_access_token(user.id, role.id, &role.name, now)?;
        let refresh_token = self.ctx.issuer.issue_refresh_token(user.id)?;

        let session = self
            .ctx
            .sessions
            .upsert_session(user.id, &refresh_token, Self::session_expiry(now), now)
            .await?;

        info!(user_id = %user.id, role = %role.name, "login succeeded");

        Ok(LoginOutcome {
            user_id: user.id,
            role_name: role.name,
            access_token,
            session,
        })
    }

    /// Exchange a session's refresh token for a new access token, rotating the
    /// refresh token.
    ///
    /// The old refresh token stops working as soon as the rotation is stored.
    /// Concurrent refreshes for the same user race at the store: the last
    /// write decides the live token and the other caller's token fails on its
    /// next use. A session deleted between lookup and rotation (a concurrent
    /// logout) fails the refresh and no token is handed out.
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<RefreshOutcome, AuthError> {
        let refresh_token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoSessionToken)?;

        let found = self
            .ctx
            .sessions
            .find_session(refresh_token)
            .await?
            .ok_or(AuthError::InvalidSessionToken)?;

        let now = self.ctx.clock.now();
        let user_id = found.session.user_id;
        if found.session.is_expired_at(now) {
            warn!(%user_id, "refresh with expired session");
            return Err(AuthError::ExpiredSessionToken);
        }

        let role = self.ctx.resolve_role(found.role_id).await?;
        let access_token = self
            .ctx
            .issuer
            .issue_access_token(user_id, role.id, &role.name, now)?;
        let new_refresh = self.ctx.issuer.issue_refresh_token(user_id)?;
        let session_expires_at = Self::session_expiry(now);

        let rotated = self
            .ctx
            .sessions
            .update_session(user_id, &new_refresh, session_expires_at)
            .await?;
        if !rotated {
            warn!(%user_id, "session removed during refresh");
            return Err(AuthError::InvalidSessionToken);
        }

        info!(%user_id, "tokens refreshed");

        Ok(RefreshOutcome {
            user_id,
            access_token,
            refresh_token: new_refresh,
            session_expires_at,
        })
    }

    /// Delete the session holding `refresh_token`. Deleting an absent session
    /// is not an error.
    pub async fn logout(&self, refresh_token: Option<&str>) -> Result<(), AuthError> {
        let refresh_token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoSessionToken)?;
        let removed = self.ctx.sessions.delete_session(refresh_token).await?;
        debug!(removed, "logout");
        Ok(())
    }

    /// Replace a user's password after checking the current one. Any pending
    /// reset token is cleared by the same write.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validate_new_password(new_password)?;

        let user = self
            .ctx
            .users
            .find_user_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound(user_id))?;

        if !self.ctx.hasher.verify(current_password, &user.password_hash)? {
            warn!(%user_id, "password change with wrong current password");
            return Err(AuthError::WrongPassword);
        }

        let hash = self.ctx.hasher.hash(new_password)?;
        self.ctx.users.update_password(user_id, &hash).await?;
        info!(%user_id, "password changed");
        Ok(())
    }
}
