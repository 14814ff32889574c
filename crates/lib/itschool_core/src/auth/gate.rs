//! Capability gate. Pure: works on an already-resolved role, no store access.

use super::AuthError;
use super::capability::{Capability, RecordKind, has_access_to_type};
use crate::models::auth::Role;

/// Allow iff `role` grants `capability`.
///
/// `None` means the authenticator never ran for this request, which is a
/// wiring defect and reported as [`AuthError::MissingIdentity`].
pub fn authorize(role: Option<&Role>, capability: Capability) -> Result<(), AuthError> {
    let role = role.ok_or(AuthError::MissingIdentity)?;
    if role.permissions.grants(capability) {
        Ok(())
    } else {
        Err(AuthError::Forbidden(capability.to_string()))
    }
}

/// Allow writes of a record of `kind` (lesson, freeze, prolongation).
pub fn authorize_record_kind(role: &Role, kind: &str) -> Result<(), AuthError> {
    if has_access_to_type(&role.permissions, kind) {
        return Ok(());
    }
    Err(AuthError::Forbidden(match RecordKind::parse(kind) {
        Some(k) => k
            .required_any()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(" or "),
        None => format!("unknown record kind {kind:?}"),
    }))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use uuid::Uuid;

    use super::*;
    use crate::auth::capability::Permissions;

    fn role(perms: Permissions) -> Role {
        Role {
            id: Uuid::new_v4(),
            name: "r".into(),
            permissions: perms,
        }
    }

    #[test]
    fn grants_only_when_key_is_true() {
        let granted = role(Permissions::granting(&[Capability::AccessCurator]));
        assert!(authorize(Some(&granted), Capability::AccessCurator).is_ok());

        let empty = role(Permissions::default());
        assert!(matches!(
            authorize(Some(&empty), Capability::AccessCurator),
            Err(AuthError::Forbidden(_))
        ));

        let explicit_false = role(Permissions::from(BTreeMap::from([(
            "access_curator".to_string(),
            false,
        )])));
        assert!(matches!(
            authorize(Some(&explicit_false), Capability::AccessCurator),
            Err(AuthError::Forbidden(_))
        ));

        let other_key = role(Permissions::granting(&[Capability::AccessManager]));
        assert!(authorize(Some(&other_key), Capability::AccessCurator).is_err());
    }

    #[test]
    fn missing_role_is_a_wiring_error() {
        assert!(matches!(
            authorize(None, Capability::AccessSettings),
            Err(AuthError::MissingIdentity)
        ));
    }

    #[test]
    fn record_kind_gate() {
        let manager = role(Permissions::granting(&[Capability::AccessManager]));
        assert!(authorize_record_kind(&manager, "freeze").is_ok());
        assert!(authorize_record_kind(&manager, "prolongation").is_ok());
        assert!(matches!(
            authorize_record_kind(&manager, "lesson"),
            Err(AuthError::Forbidden(msg)) if msg == "access_curator or access_settings"
        ));
        assert!(authorize_record_kind(&manager, "payment").is_err());
    }
}
