//! Permission naming scheme.
//!
//! Names are derived from a module and a verb: `<verb>_admin_<module>` for the
//! administrative modules and `<verb>_<module>` for everything else.
//! [`FULL_PERMISSIONS`] is not derived; holding it authorizes every name.

use std::fmt;
use std::str::FromStr;

/// Bypasses every permission check
pub const FULL_PERMISSIONS: &str = "full_permissions";

/// Modules whose permissions carry the `admin_` infix
pub const ADMINIZED_MODULES: [&str; 3] = ["user", "role", "permission"];

/// Modules the seeded catalog covers
pub const CATALOG_MODULES: [&str; 8] = [
    "building",
    "building_admin",
    "forms",
    "form_template",
    "permission",
    "profile_user",
    "role",
    "user",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PermissionVerb {
    Create,
    Edit,
    Read,
    Delete,
    Navbar,
}

impl PermissionVerb {
    pub const ALL: [Self; 5] = [Self::Create, Self::Edit, Self::Read, Self::Delete, Self::Navbar];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Edit => "edit",
            Self::Read => "read",
            Self::Delete => "delete",
            Self::Navbar => "navbar",
        }
    }
}

impl fmt::Display for PermissionVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionVerb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| format!("unknown permission verb `{s}`"))
    }
}

#[must_use]
pub fn derive_permission_name(module: &str, verb: PermissionVerb) -> String {
    if ADMINIZED_MODULES.contains(&module) {
        format!("{verb}_admin_{module}")
    } else {
        format!("{verb}_{module}")
    }
}

/// `full_permissions` followed by every derived name of the catalog modules
#[must_use]
pub fn permission_catalog() -> Vec<String> {
    std::iter::once(FULL_PERMISSIONS.to_string())
        .chain(CATALOG_MODULES.iter().flat_map(|module| {
            PermissionVerb::ALL
                .into_iter()
                .map(move |verb| derive_permission_name(module, verb))
        }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_adminized_modules_get_infix() {
        assert_eq!(derive_permission_name("role", PermissionVerb::Edit), "edit_admin_role");
        assert_eq!(derive_permission_name("user", PermissionVerb::Read), "read_admin_user");
        assert_eq!(
            derive_permission_name("permission", PermissionVerb::Delete),
            "delete_admin_permission"
        );
    }

    #[test]
    fn test_other_modules_are_plain() {
        assert_eq!(derive_permission_name("forms", PermissionVerb::Read), "read_forms");
        assert_eq!(
            derive_permission_name("building_admin", PermissionVerb::Navbar),
            "navbar_building_admin"
        );
    }

    #[test]
    fn test_verb_parsing() {
        assert_eq!("navbar".parse::<PermissionVerb>(), Ok(PermissionVerb::Navbar));
        assert!("Edit".parse::<PermissionVerb>().is_err());
    }

    #[test]
    fn test_catalog_is_complete_and_unique() {
        let catalog = permission_catalog();
        assert_eq!(catalog[0], FULL_PERMISSIONS);
        assert_eq!(catalog.len(), 1 + CATALOG_MODULES.len() * PermissionVerb::ALL.len());

        let unique: HashSet<_> = catalog.iter().collect();
        assert_eq!(unique.len(), catalog.len());
        assert!(catalog.contains(&"create_admin_user".to_string()));
        assert!(catalog.contains(&"read_form_template".to_string()));
    }
}
