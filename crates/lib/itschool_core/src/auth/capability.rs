//! Capability vocabulary.
//!
//! Roles persist an open `name -> bool` map (the `permissions` JSON column),
//! but every check in the codebase goes through [`Capability`], the closed set
//! of names this backend understands. Keys missing from the map read as
//! `false`.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Well-known capability flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Administrative settings: users, courses, lessons.
    AccessSettings,
    /// Curator functions: attaching students and courses.
    AccessCurator,
    /// Manager functions: viewing students, freezes and prolongations.
    AccessManager,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::AccessSettings,
        Capability::AccessCurator,
        Capability::AccessManager,
    ];

    /// Key used in the persisted permissions map.
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::AccessSettings => "access_settings",
            Capability::AccessCurator => "access_curator",
            Capability::AccessManager => "access_manager",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role's capability map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(BTreeMap<String, bool>);

impl Permissions {
    /// Build a map granting exactly `granted` and explicitly denying the
    /// rest of the vocabulary.
    pub fn granting(granted: &[Capability]) -> Self {
        Self(
            Capability::ALL
                .into_iter()
                .map(|c| (c.as_str().to_string(), granted.contains(&c)))
                .collect(),
        )
    }

    /// True iff the map holds `capability` with value `true`.
    pub fn grants(&self, capability: Capability) -> bool {
        self.0.get(capability.as_str()).copied().unwrap_or(false)
    }

    /// Capabilities from the vocabulary that are granted.
    pub fn granted(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.grants(*c))
            .collect()
    }

    pub fn as_map(&self) -> &BTreeMap<String, bool> {
        &self.0
    }
}

impl From<BTreeMap<String, bool>> for Permissions {
    fn from(map: BTreeMap<String, bool>) -> Self {
        Self(map)
    }
}

/// Sub-resource kinds whose writes are gated by [`has_access_to_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Lesson,
    Freeze,
    Prolongation,
}

impl RecordKind {
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "lesson" => Some(RecordKind::Lesson),
            "freeze" => Some(RecordKind::Freeze),
            "prolongation" => Some(RecordKind::Prolongation),
            _ => None,
        }
    }

    /// Capabilities any one of which allows writing this kind.
    pub fn required_any(self) -> &'static [Capability] {
        match self {
            RecordKind::Lesson => &[Capability::AccessCurator, Capability::AccessSettings],
            RecordKind::Freeze | RecordKind::Prolongation => {
                &[Capability::AccessManager, Capability::AccessSettings]
            }
        }
    }
}

/// Whether `permissions` may write a record of kind `kind`.
///
/// `"lesson"` needs `access_curator` or `access_settings`; `"freeze"` and
/// `"prolongation"` need `access_manager` or `access_settings`. Any other
/// string is denied.
pub fn has_access_to_type(permissions: &Permissions, kind: &str) -> bool {
    RecordKind::parse(kind)
        .map(|k| k.required_any().iter().any(|c| permissions.grants(*c)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only(caps: &[Capability]) -> Permissions {
        Permissions::granting(caps)
    }

    #[test]
    fn capability_keys_are_stable() {
        let keys: Vec<_> = Capability::ALL.iter().map(|c| c.to_string()).collect();
        assert_eq!(keys, ["access_settings", "access_curator", "access_manager"]);
    }

    #[test]
    fn grants_requires_key_present_and_true() {
        let empty = Permissions::default();
        assert!(!empty.grants(Capability::AccessSettings));

        let denied = only(&[]);
        assert_eq!(denied.as_map().len(), Capability::ALL.len());
        assert!(!denied.grants(Capability::AccessSettings));

        let perms = only(&[Capability::AccessSettings]);
        assert!(perms.grants(Capability::AccessSettings));
        assert!(!perms.grants(Capability::AccessManager));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut map = BTreeMap::new();
        map.insert("access_reports".to_string(), true);
        let perms = Permissions::from(map);
        assert!(perms.granted().is_empty());
    }

    #[test]
    fn lesson_needs_curator_or_settings() {
        assert!(has_access_to_type(&only(&[Capability::AccessCurator]), "lesson"));
        assert!(has_access_to_type(&only(&[Capability::AccessSettings]), "lesson"));
        assert!(!has_access_to_type(&only(&[Capability::AccessManager]), "lesson"));
        assert!(!has_access_to_type(&Permissions::default(), "lesson"));
    }

    #[test]
    fn freeze_and_prolongation_need_manager_or_settings() {
        for kind in ["freeze", "prolongation"] {
            assert!(has_access_to_type(&only(&[Capability::AccessManager]), kind));
            assert!(has_access_to_type(&only(&[Capability::AccessSettings]), kind));
            assert!(!has_access_to_type(&only(&[Capability::AccessCurator]), kind));
        }
    }

    #[test]
    fn unknown_kinds_are_denied_even_for_admins() {
        let admin = only(&Capability::ALL);
        for kind in ["", "Lesson", "attendance", "freeze "] {
            assert!(!has_access_to_type(&admin, kind), "{kind:?} should be denied");
        }
    }

    #[test]
    fn permissions_serialize_as_plain_object() {
        let perms = only(&[Capability::AccessManager]);
        let json = serde_json::to_value(&perms).unwrap();
        assert_eq!(json["access_manager"], true);
        assert_eq!(json["access_settings"], false);
    }
}
