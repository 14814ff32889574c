//! Authentication and authorization logic.
//!
//! Provides password hashing, token issuance, the login / refresh / logout
//! sequencer, the password reset sequencer, per-request identity resolution
//! and the capability gate. Shared by every HTTP surface in `itschool_api`.

pub mod accounts;
pub mod authenticator;
pub mod capability;
pub mod gate;
pub mod issuer;
pub mod password;
pub mod reset;
pub mod service;

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::clock::Clock;
use crate::store::{RoleStore, SessionStore, StoreError, UserStore};

use self::issuer::TokenIssuer;
use self::password::PasswordHasher;

/// Authentication errors.
///
/// Each variant is one internal failure kind. Several of them
/// collapse into the same client-facing error at the HTTP boundary (e.g.
/// `UnknownEmail` and `WrongPassword` both become "invalid credentials").
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No user with that email")]
    UnknownEmail,

    #[error("Password does not match")]
    WrongPassword,

    #[error("Role {0} could not be resolved")]
    RoleResolution(Uuid),

    #[error("Signing error: {0}")]
    Signing(String),

    #[error("Random source error: {0}")]
    RandomSource(String),

    #[error("No session token")]
    NoSessionToken,

    #[error("Invalid session token")]
    InvalidSessionToken,

    #[error("Expired session token")]
    ExpiredSessionToken,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("User {0} not found")]
    UserNotFound(Uuid),

    #[error("Reset token not found")]
    ResetTokenUnknown,

    #[error("Reset token expired")]
    ResetTokenExpired,

    #[error("Missing capability: {0}")]
    Forbidden(String),

    #[error("No authenticated identity attached to the request")]
    MissingIdentity,

    #[error("Password hashing error: {0}")]
    Hashing(String),

    #[error("Email dispatch error: {0}")]
    EmailDispatch(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Collaborators shared by every auth sequencer.
///
/// Cheap to clone: everything is behind an `Arc`.
#[derive(Clone)]
pub struct AuthContext {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub roles: Arc<dyn RoleStore>,
    pub issuer: TokenIssuer,
    pub hasher: Arc<dyn PasswordHasher>,
    pub clock: Arc<dyn Clock>,
}

impl AuthContext {
    /// Resolve a role by id. Absence is an internal error: every user row
    /// references a role.
    pub(crate) async fn resolve_role(&self, role_id: Uuid) -> Result<crate::models::auth::Role, AuthError> {
        self.roles
            .find_role_by_id(role_id)
            .await?
            .ok_or(AuthError::RoleResolution(role_id))
    }
}
