//! Auth-related database queries.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::{StoreError, StoreResult};
use crate::auth::capability::Permissions;
use crate::models::auth::{NewUser, Role, Session, SessionWithRole, User};
use crate::uuid::uuidv7;

type UserRow = (
    Uuid,
    String,
    String,
    String,
    String,
    Uuid,
    Option<String>,
    Option<DateTime<Utc>>,
);

const USER_COLUMNS: &str = "id, full_name, email, password_hash, phone_number, role_id, \
                            reset_token, reset_token_expires_at";

fn user_from_row(row: UserRow) -> User {
    let (id, full_name, email, password_hash, telephone, role_id, reset_token, reset_expires) =
        row;
    User {
        id,
        full_name,
        email,
        password_hash,
        telephone,
        role_id,
        reset_token,
        reset_token_expires_at: reset_expires,
    }
}

fn role_from_row((id, name, permissions): (Uuid, String, Json<BTreeMap<String, bool>>)) -> Role {
    Role {
        id,
        name,
        permissions: Permissions::from(permissions.0),
    }
}

/// Map unique-constraint violations to [`StoreError::Conflict`].
fn conflict_on_unique(e: sqlx::Error, what: &str) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{what} already exists"))
        }
        _ => StoreError::Sql(e),
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Fetch a user by email (case-insensitive).
pub async fn find_user_by_email(pool: &PgPool, email: &str) -> StoreResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
    ))
    .bind(email)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(user_from_row))
}

/// Fetch a user by ID.
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> StoreResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(user_from_row))
}

/// Create a new user, returning the user ID.
pub async fn create_user(pool: &PgPool, user: &NewUser) -> StoreResult<Uuid> {
    sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (full_name, email, password_hash, phone_number, role_id) \
         VALUES ($1, $2, $3, $4, $5) RETURNING id",
    )
    .bind(&user.full_name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.telephone)
    .bind(user.role_id)
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_on_unique(e, "email"))
}

/// Delete a user (sessions cascade).
pub async fn delete_user(pool: &PgPool, id: Uuid) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Count users holding a role.
pub async fn count_users_with_role(pool: &PgPool, role_id: Uuid) -> StoreResult<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role_id = $1")
        .bind(role_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Store a reset token and its expiry on the user row.
pub async fn set_reset_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    expires_at: DateTime<Utc>,
) -> StoreResult<()> {
    sqlx::query("UPDATE users SET reset_token = $1, reset_token_expires_at = $2 WHERE id = $3")
        .bind(token)
        .bind(expires_at)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Fetch the user holding a reset token.
pub async fn find_user_by_reset_token(pool: &PgPool, token: &str) -> StoreResult<Option<User>> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE reset_token = $1"
    ))
    .bind(token)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(user_from_row))
}

/// Replace the password hash; the reset token and its expiry are nulled in
/// the same statement.
pub async fn update_password(pool: &PgPool, user_id: Uuid, password_hash: &str) -> StoreResult<()> {
    sqlx::query(
        "UPDATE users SET password_hash = $1, reset_token = NULL, reset_token_expires_at = NULL \
         WHERE id = $2",
    )
    .bind(password_hash)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Null the reset token and its expiry.
pub async fn clear_reset_token(pool: &PgPool, user_id: Uuid) -> StoreResult<()> {
    sqlx::query("UPDATE users SET reset_token = NULL, reset_token_expires_at = NULL WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Create or replace the session for a user (single statement).
pub async fn upsert_session(
    pool: &PgPool,
    user_id: Uuid,
    refresh_token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> StoreResult<Session> {
    let (id, created_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
        "INSERT INTO sessions (id, user_id, refresh_token, expires_at, created_at) \
         VALUES ($1, $2, $3, $4, $5) \
         ON CONFLICT (user_id) DO UPDATE \
           SET refresh_token = EXCLUDED.refresh_token, \
               expires_at = EXCLUDED.expires_at, \
               created_at = EXCLUDED.created_at \
         RETURNING id, created_at",
    )
    .bind(uuidv7())
    .bind(user_id)
    .bind(refresh_token)
    .bind(expires_at)
    .bind(now)
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_on_unique(e, "refresh token"))?;

    Ok(Session {
        id,
        user_id,
        refresh_token: refresh_token.to_string(),
        expires_at,
        created_at,
    })
}

/// Find a session by refresh token, joined with the owner's role id.
pub async fn find_session(pool: &PgPool, refresh_token: &str) -> StoreResult<Option<SessionWithRole>> {
    let row = sqlx::query_as::<_, (Uuid, Uuid, String, DateTime<Utc>, DateTime<Utc>, Uuid)>(
        "SELECT s.id, s.user_id, s.refresh_token, s.expires_at, s.created_at, u.role_id \
         FROM sessions s \
         JOIN users u ON s.user_id = u.id \
         WHERE s.refresh_token = $1",
    )
    .bind(refresh_token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(id, user_id, refresh_token, expires_at, created_at, role_id)| SessionWithRole {
            session: Session {
                id,
                user_id,
                refresh_token,
                expires_at,
                created_at,
            },
            role_id,
        },
    ))
}

/// Rewrite a user's refresh token and expiry. `false` if the user has no
/// session.
pub async fn update_session(
    pool: &PgPool,
    user_id: Uuid,
    refresh_token: &str,
    expires_at: DateTime<Utc>,
) -> StoreResult<bool> {
    let result =
        sqlx::query("UPDATE sessions SET refresh_token = $1, expires_at = $2 WHERE user_id = $3")
            .bind(refresh_token)
            .bind(expires_at)
            .bind(user_id)
            .execute(pool)
            .await
            .map_err(|e| conflict_on_unique(e, "refresh token"))?;
    Ok(result.rows_affected() > 0)
}

/// Delete a session by refresh token.
pub async fn delete_session(pool: &PgPool, refresh_token: &str) -> StoreResult<bool> {
    let result = sqlx::query("DELETE FROM sessions WHERE refresh_token = $1")
        .bind(refresh_token)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Fetch a role by ID. A NULL permissions column reads as an empty map.
pub async fn find_role_by_id(pool: &PgPool, id: Uuid) -> StoreResult<Option<Role>> {
    let row = sqlx::query_as::<_, (Uuid, String, Json<BTreeMap<String, bool>>)>(
        "SELECT id, name, COALESCE(permissions, '{}'::jsonb) FROM roles WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(role_from_row))
}

/// Fetch a role by name.
pub async fn find_role_by_name(pool: &PgPool, name: &str) -> StoreResult<Option<Role>> {
    let row = sqlx::query_as::<_, (Uuid, String, Json<BTreeMap<String, bool>>)>(
        "SELECT id, name, COALESCE(permissions, '{}'::jsonb) FROM roles WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(role_from_row))
}

/// Create a role.
pub async fn create_role(pool: &PgPool, name: &str, permissions: &Permissions) -> StoreResult<Role> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO roles (name, permissions) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(Json(permissions.as_map().clone()))
    .fetch_one(pool)
    .await
    .map_err(|e| conflict_on_unique(e, "role"))?;
    Ok(Role {
        id,
        name: name.to_string(),
        permissions: permissions.clone(),
    })
}
