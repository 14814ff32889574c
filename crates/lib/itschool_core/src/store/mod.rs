//! Persistence seams for the auth core.
//!
//! Three async traits (`UserStore`, `SessionStore`, `RoleStore`) with two
//! implementations: [`postgres::PgStore`] over `sqlx` and
//! [`memory::MemoryStore`] over in-process maps. Sequencers only ever see
//! `Arc<dyn …>`.
//!
//! Time never comes from the database: callers pass the instant from the
//! injected clock.

pub mod memory;
pub mod postgres;
pub mod queries;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::capability::Permissions;
use crate::models::auth::{NewUser, Role, Session, SessionWithRole, User};

/// Storage errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQL error: {0}")]
    Sql(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Credential store: identity, password hash, role reference, reset-token state.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Case-insensitive lookup.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Insert a user. Fails with [`StoreError::Conflict`] if the email is taken
    /// (case-insensitively).
    async fn create_user(&self, user: NewUser) -> StoreResult<Uuid>;

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    async fn count_users_with_role(&self, role_id: Uuid) -> StoreResult<i64>;

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()>;

    /// Lookup by reset token regardless of expiry; the caller decides.
    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>>;

    /// Replace the password hash and null both reset-token fields in one write.
    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()>;

    async fn clear_reset_token(&self, user_id: Uuid) -> StoreResult<()>;
}

/// Session store: at most one live refresh token per user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create the user's session, replacing any existing one.
    async fn upsert_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Session>;

    /// Lookup by refresh token, joined with the owner's role id. Expired rows
    /// are returned too.
    async fn find_session(&self, refresh_token: &str) -> StoreResult<Option<SessionWithRole>>;

    /// Rewrite the user's refresh token and expiry (last writer wins).
    /// Returns `false` when the user has no session left to rewrite.
    async fn update_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Delete by refresh token. Returns whether a row was removed.
    async fn delete_session(&self, refresh_token: &str) -> StoreResult<bool>;
}

/// Role store: named capability bundles.
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_role_by_id(&self, id: Uuid) -> StoreResult<Option<Role>>;

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>>;

    async fn create_role(&self, name: &str, permissions: &Permissions) -> StoreResult<Role>;
}
