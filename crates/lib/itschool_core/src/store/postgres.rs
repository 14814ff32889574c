//! PostgreSQL-backed stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{RoleStore, SessionStore, StoreResult, UserStore, queries};
use crate::auth::capability::Permissions;
use crate::models::auth::{NewUser, Role, Session, SessionWithRole, User};

/// All three stores over one connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        queries::find_user_by_email(&self.pool, email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        queries::find_user_by_id(&self.pool, id).await
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<Uuid> {
        queries::create_user(&self.pool, &user).await
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        queries::delete_user(&self.pool, id).await
    }

    async fn count_users_with_role(&self, role_id: Uuid) -> StoreResult<i64> {
        queries::count_users_with_role(&self.pool, role_id).await
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        queries::set_reset_token(&self.pool, user_id, token, expires_at).await
    }

    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        queries::find_user_by_reset_token(&self.pool, token).await
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
        queries::update_password(&self.pool, user_id, password_hash).await
    }

    async fn clear_reset_token(&self, user_id: Uuid) -> StoreResult<()> {
        queries::clear_reset_token(&self.pool, user_id).await
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn upsert_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Session> {
        queries::upsert_session(&self.pool, user_id, refresh_token, expires_at, now).await
    }

    async fn find_session(&self, refresh_token: &str) -> StoreResult<Option<SessionWithRole>> {
        queries::find_session(&self.pool, refresh_token).await
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        queries::update_session(&self.pool, user_id, refresh_token, expires_at).await
    }

    async fn delete_session(&self, refresh_token: &str) -> StoreResult<bool> {
        queries::delete_session(&self.pool, refresh_token).await
    }
}

#[async_trait]
impl RoleStore for PgStore {
    async fn find_role_by_id(&self, id: Uuid) -> StoreResult<Option<Role>> {
        queries::find_role_by_id(&self.pool, id).await
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        queries::find_role_by_name(&self.pool, name).await
    }

    async fn create_role(&self, name: &str, permissions: &Permissions) -> StoreResult<Role> {
        queries::create_role(&self.pool, name, permissions).await
    }
}
