//! Startup seeding of the base roles and the first administrator.

use tracing::info;
use uuid::Uuid;

use crate::auth::accounts::{AccountService, CreateUser, RoleRef};
use crate::auth::capability::{Capability, Permissions};
use crate::auth::{AuthContext, AuthError};
use crate::models::auth::Role;
use crate::store::StoreError;

/// Name of the role whose holders count as administrators.
pub const ADMIN_ROLE: &str = "admin";

/// Base roles and the capabilities each one grants.
pub const BASE_ROLES: [(&str, &[Capability]); 3] = [
    (ADMIN_ROLE, &Capability::ALL),
    ("manager", &[Capability::AccessManager]),
    ("curator", &[Capability::AccessCurator]),
];

/// Administrator account created when no user holds the admin role.
#[derive(Clone, Default)]
pub struct AdminSeed {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: Option<String>,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("phone", &self.phone)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// What a seeding run changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: Vec<String>,
    pub admin_created: Option<Uuid>,
}

async fn ensure_role(
    ctx: &AuthContext,
    name: &str,
    granted: &[Capability],
) -> Result<(Role, bool), AuthError> {
    if let Some(role) = ctx.roles.find_role_by_name(name).await? {
        return Ok((role, false));
    }
    match ctx.roles.create_role(name, &Permissions::granting(granted)).await {
        Ok(role) => Ok((role, true)),
        // Another instance created it first.
        Err(StoreError::Conflict(_)) => ctx
            .roles
            .find_role_by_name(name)
            .await?
            .map(|role| (role, false))
            .ok_or(AuthError::RoleResolution(Uuid::nil())),
        Err(e) => Err(e.into()),
    }
}

/// Create missing base roles, then bootstrap an admin user if none exists.
///
/// Safe to run on every start. Fails when an admin has to be created but
/// `seed` lacks an email or password.
pub async fn seed_roles_and_admin(
    ctx: &AuthContext,
    seed: &AdminSeed,
) -> Result<SeedReport, AuthError> {
    let mut report = SeedReport::default();
    let mut admin_role = None;

    for (name, granted) in BASE_ROLES {
        let (role, created) = ensure_role(ctx, name, granted).await?;
        if created {
            info!(role = name, "created role");
            report.roles_created.push(name.to_string());
        }
        if name == ADMIN_ROLE {
            admin_role = Some(role);
        }
    }
    let admin_role = admin_role.ok_or(AuthError::RoleResolution(Uuid::nil()))?;

    if ctx.users.count_users_with_role(admin_role.id).await? > 0 {
        return Ok(report);
    }

    let password = seed.password.as_deref().unwrap_or_default();
    if seed.email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::Validation(
            "ADMIN_MAIL and INITIAL_PASSWORD are required to create the first admin".into(),
        ));
    }

    let id = AccountService::new(ctx.clone())
        .create_user(CreateUser {
            full_name: seed.name.clone(),
            email: seed.email.clone(),
            password: password.to_string(),
            telephone: seed.phone.clone(),
            role: RoleRef::Id(admin_role.id),
        })
        .await?;
    info!(user_id = %id, email = %seed.email, "admin user created");
    report.admin_created = Some(id);
    Ok(report)
}
