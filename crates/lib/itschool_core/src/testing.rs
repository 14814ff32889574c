//! Shared fixtures for unit tests: an [`AuthContext`] over [`MemoryStore`]
//! with a manual clock, cheap bcrypt, the three standard roles and one user
//! per role.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::auth::capability::{Capability, Permissions};
use crate::auth::issuer::TokenIssuer;
use crate::auth::password::{BcryptHasher, PasswordHasher};
use crate::clock::ManualClock;
use crate::models::auth::{NewUser, Role};
use crate::store::memory::MemoryStore;
use crate::store::{RoleStore, UserStore};

pub const SECRET: &str = "unit-test-secret";
pub const PASSWORD: &str = "pw123";

pub struct Fixture {
    pub ctx: AuthContext,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub admin_role: Role,
    pub manager_role: Role,
    pub curator_role: Role,
    pub admin_id: Uuid,
    pub curator_id: Uuid,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap(),
        ));
        let hasher = Arc::new(BcryptHasher::new(4));

        let admin_role = store
            .create_role("admin", &Permissions::granting(&Capability::ALL))
            .await
            .unwrap();
        let manager_role = store
            .create_role(
                "manager",
                &Permissions::granting(&[Capability::AccessManager]),
            )
            .await
            .unwrap();
        let curator_role = store
            .create_role(
                "curator",
                &Permissions::granting(&[Capability::AccessCurator]),
            )
            .await
            .unwrap();

        let hash = hasher.hash(PASSWORD).unwrap();
        let admin_id = store
            .create_user(NewUser {
                full_name: "Admin".into(),
                email: "user@x.com".into(),
                password_hash: hash.clone(),
                telephone: "+10000000000".into(),
                role_id: admin_role.id,
            })
            .await
            .unwrap();
        let curator_id = store
            .create_user(NewUser {
                full_name: "Curator".into(),
                email: "curator@x.com".into(),
                password_hash: hash,
                telephone: String::new(),
                role_id: curator_role.id,
            })
            .await
            .unwrap();

        let ctx = AuthContext {
            users: store.clone(),
            sessions: store.clone(),
            roles: store.clone(),
            issuer: TokenIssuer::new(Some(SECRET)),
            hasher,
            clock: clock.clone(),
        };

        Self {
            ctx,
            store,
            clock,
            admin_role,
            manager_role,
            curator_role,
            admin_id,
            curator_id,
        }
    }
}
