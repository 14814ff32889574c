//! In-process stores.
//!
//! Same contract as the PostgreSQL implementation, including the unique
//! constraints (case-insensitive email, role name, refresh token, one session
//! per user) and the users → sessions cascade. Used by tests and for running
//! the API without a database.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RoleStore, SessionStore, StoreError, StoreResult, UserStore};
use crate::auth::capability::Permissions;
use crate::models::auth::{NewUser, Role, Session, SessionWithRole, User};
use crate::uuid::uuidv7;

#[derive(Debug, Default)]
struct State {
    users: HashMap<Uuid, User>,
    roles: HashMap<Uuid, Role>,
    /// Keyed by user id: one session per user.
    sessions: HashMap<Uuid, Session>,
}

impl State {
    fn email_taken(&self, email: &str) -> bool {
        let needle = email.to_lowercase();
        self.users.values().any(|u| u.email.to_lowercase() == needle)
    }

    fn refresh_token_taken_by_other(&self, user_id: Uuid, token: &str) -> bool {
        self.sessions
            .values()
            .any(|s| s.refresh_token == token && s.user_id != user_id)
    }
}

/// All three stores behind one lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live session rows (for assertions).
    pub async fn session_count(&self) -> usize {
        self.state.read().await.sessions.len()
    }

    /// The session row currently held by `user_id`, if any.
    pub async fn session_for_user(&self, user_id: Uuid) -> Option<Session> {
        self.state.read().await.sessions.get(&user_id).cloned()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let needle = email.to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email.to_lowercase() == needle)
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<Uuid> {
        let mut state = self.state.write().await;
        if state.email_taken(&user.email) {
            return Err(StoreError::Conflict("email already exists".into()));
        }
        let id = Uuid::new_v4();
        state.users.insert(
            id,
            User {
                id,
                full_name: user.full_name,
                email: user.email,
                password_hash: user.password_hash,
                telephone: user.telephone,
                role_id: user.role_id,
                reset_token: None,
                reset_token_expires_at: None,
            },
        );
        Ok(id)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        state.sessions.remove(&id);
        Ok(state.users.remove(&id).is_some())
    }

    async fn count_users_with_role(&self, role_id: Uuid) -> StoreResult<i64> {
        let state = self.state.read().await;
        Ok(state.users.values().filter(|u| u.role_id == role_id).count() as i64)
    }

    async fn set_reset_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.id != user_id && u.reset_token.as_deref() == Some(token))
        {
            return Err(StoreError::Conflict("reset token already exists".into()));
        }
        if let Some(user) = state.users.get_mut(&user_id) {
            user.reset_token = Some(token.to_string());
            user.reset_token_expires_at = Some(expires_at);
        }
        Ok(())
    }

    async fn find_user_by_reset_token(&self, token: &str) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.reset_token.as_deref() == Some(token))
            .cloned())
    }

    async fn update_password(&self, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.password_hash = password_hash.to_string();
            user.reset_token = None;
            user.reset_token_expires_at = None;
        }
        Ok(())
    }

    async fn clear_reset_token(&self, user_id: Uuid) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.reset_token = None;
            user.reset_token_expires_at = None;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn upsert_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> StoreResult<Session> {
        let mut state = self.state.write().await;
        if state.refresh_token_taken_by_other(user_id, refresh_token) {
            return Err(StoreError::Conflict("refresh token already exists".into()));
        }
        let id = state
            .sessions
            .get(&user_id)
            .map(|s| s.id)
            .unwrap_or_else(uuidv7);
        let session = Session {
            id,
            user_id,
            refresh_token: refresh_token.to_string(),
            expires_at,
            created_at: now,
        };
        state.sessions.insert(user_id, session.clone());
        Ok(session)
    }

    async fn find_session(&self, refresh_token: &str) -> StoreResult<Option<SessionWithRole>> {
        let state = self.state.read().await;
        let found = state
            .sessions
            .values()
            .find(|s| s.refresh_token == refresh_token)
            .and_then(|s| {
                state.users.get(&s.user_id).map(|u| SessionWithRole {
                    session: s.clone(),
                    role_id: u.role_id,
                })
            });
        Ok(found)
    }

    async fn update_session(
        &self,
        user_id: Uuid,
        refresh_token: &str,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.refresh_token_taken_by_other(user_id, refresh_token) {
            return Err(StoreError::Conflict("refresh token already exists".into()));
        }
        let Some(session) = state.sessions.get_mut(&user_id) else {
            return Ok(false);
        };
        session.refresh_token = refresh_token.to_string();
        session.expires_at = expires_at;
        Ok(true)
    }

    async fn delete_session(&self, refresh_token: &str) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let before = state.sessions.len();
        state.sessions.retain(|_, s| s.refresh_token != refresh_token);
        Ok(state.sessions.len() < before)
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_role_by_id(&self, id: Uuid) -> StoreResult<Option<Role>> {
        Ok(self.state.read().await.roles.get(&id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> StoreResult<Option<Role>> {
        let state = self.state.read().await;
        Ok(state.roles.values().find(|r| r.name == name).cloned())
    }

    async fn create_role(&self, name: &str, permissions: &Permissions) -> StoreResult<Role> {
        let mut state = self.state.write().await;
        if state.roles.values().any(|r| r.name == name) {
            return Err(StoreError::Conflict("role already exists".into()));
        }
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
            permissions: permissions.clone(),
        };
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::auth::capability::Capability;

    async fn store_with_user(email: &str) -> (MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let role = store
            .create_role("curator", &Permissions::granting(&[Capability::AccessCurator]))
            .await
            .unwrap();
        let id = store
            .create_user(NewUser {
                full_name: "Test User".into(),
                email: email.into(),
                password_hash: "hash".into(),
                telephone: String::new(),
                role_id: role.id,
            })
            .await
            .unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn email_uniqueness_is_case_insensitive() {
        let (store, id) = store_with_user("Teacher@School.org").await;
        let found = store.find_user_by_email("teacher@school.org").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(id));

        let role_id = store.find_user_by_id(id).await.unwrap().unwrap().role_id;
        let dup = store
            .create_user(NewUser {
                full_name: "Other".into(),
                email: "TEACHER@school.org".into(),
                password_hash: "hash".into(),
                telephone: String::new(),
                role_id,
            })
            .await;
        assert!(matches!(dup, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn upsert_keeps_one_session_per_user() {
        let (store, id) = store_with_user("a@x.com").await;
        let now = Utc::now();
        let first = store
            .upsert_session(id, "token-1", now + Duration::days(7), now)
            .await
            .unwrap();
        let second = store
            .upsert_session(id, "token-2", now + Duration::days(7), now)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.session_count().await, 1);
        assert!(store.find_session("token-1").await.unwrap().is_none());
        assert!(store.find_session("token-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn find_session_joins_role_and_returns_expired_rows() {
        let (store, id) = store_with_user("a@x.com").await;
        let now = Utc::now();
        store
            .upsert_session(id, "old", now - Duration::days(1), now - Duration::days(8))
            .await
            .unwrap();
        let found = store.find_session("old").await.unwrap().unwrap();
        let user = store.find_user_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.role_id, user.role_id);
        assert!(found.session.is_expired_at(now));
    }

    #[tokio::test]
    async fn update_session_reports_a_missing_row() {
        let (store, id) = store_with_user("a@x.com").await;
        let now = Utc::now();
        let expires = now + Duration::days(7);
        assert!(!store.update_session(id, "tok", expires).await.unwrap());
        assert_eq!(store.session_count().await, 0);

        store.upsert_session(id, "tok", expires, now).await.unwrap();
        assert!(store.update_session(id, "tok-2", expires).await.unwrap());
        assert!(store.find_session("tok-2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn deleting_user_cascades_to_session() {
        let (store, id) = store_with_user("a@x.com").await;
        let now = Utc::now();
        store
            .upsert_session(id, "tok", now + Duration::days(7), now)
            .await
            .unwrap();
        assert!(store.delete_user(id).await.unwrap());
        assert_eq!(store.session_count().await, 0);
        assert!(!store.delete_session("tok").await.unwrap());
    }

    #[tokio::test]
    async fn update_password_clears_reset_state() {
        let (store, id) = store_with_user("a@x.com").await;
        store
            .set_reset_token(id, "abc", Utc::now() + Duration::minutes(30))
            .await
            .unwrap();
        assert!(store.find_user_by_reset_token("abc").await.unwrap().is_some());

        store.update_password(id, "new-hash").await.unwrap();
        let user = store.find_user_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.password_hash, "new-hash");
        assert!(user.reset_token.is_none());
        assert!(user.reset_token_expires_at.is_none());
        assert!(store.find_user_by_reset_token("abc").await.unwrap().is_none());
    }
}
