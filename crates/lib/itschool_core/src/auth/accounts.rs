//! Account creation.

use tracing::info;
use uuid::Uuid;

use super::service::validate_new_password;
use super::{AuthContext, AuthError};
use crate::models::auth::NewUser;
use crate::store::StoreError;

/// How a new account names its role.
#[derive(Debug, Clone)]
pub enum RoleRef {
    Id(Uuid),
    Name(String),
}

/// Input for [`AccountService::create_user`]. `password` is plaintext.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub telephone: String,
    pub role: RoleRef,
}

#[derive(Clone)]
pub struct AccountService {
    ctx: AuthContext,
}

impl AccountService {
    pub fn new(ctx: AuthContext) -> Self {
        Self { ctx }
    }

    /// Create a user and return its id. Email uniqueness is case-insensitive.
    pub async fn create_user(&self, input: CreateUser) -> Result<Uuid, AuthError> {
        let full_name = input.full_name.trim();
        if full_name.is_empty() {
            return Err(AuthError::Validation("full name must not be empty".into()));
        }
        let email = input.email.trim();
        if !looks_like_email(email) {
            return Err(AuthError::Validation("email is not valid".into()));
        }
        validate_new_password(&input.password)?;

        let role = match &input.role {
            RoleRef::Id(id) => self.ctx.roles.find_role_by_id(*id).await?,
            RoleRef::Name(name) => self.ctx.roles.find_role_by_name(name).await?,
        }
        .ok_or_else(|| AuthError::Validation("unknown role".into()))?;

        let password_hash = self.ctx.hasher.hash(&input.password)?;
        let id = self
            .ctx
            .users
            .create_user(NewUser {
                full_name: full_name.to_string(),
                email: email.to_string(),
                password_hash,
                telephone: input.telephone.trim().to_string(),
                role_id: role.id,
            })
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::EmailTaken,
                other => AuthError::Store(other),
            })?;

        info!(user_id = %id, role = %role.name, "user created");
        Ok(id)
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
