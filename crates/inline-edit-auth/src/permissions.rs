//! Permission and group checks.
//!
//! Users can have:
//!
//! - **Direct permissions** assigned to their account
//! - **Group permissions** inherited from groups they belong to
//! - **Superuser access** which grants all permissions unconditionally
//!
//! Permissions use the format `"app_label.codename"` (e.g. `"schedule.change_program"`).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use inline_edit_core::ModelMeta;

use crate::user::User;

/// The actions every model gets a default permission for.
pub const DEFAULT_ACTIONS: [&str; 4] = ["add", "change", "delete", "view"];

/// A single permission, identified by an app label and a codename.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Permission {
    /// The machine-readable identifier (e.g. `"change_program"`).
    pub codename: String,
    /// The human-readable name (e.g. `"Can change program"`).
    pub name: String,
    /// The app the permission belongs to.
    pub app_label: String,
}

impl Permission {
    /// Creates a new permission.
    pub fn new(
        codename: impl Into<String>,
        name: impl Into<String>,
        app_label: impl Into<String>,
    ) -> Self {
        Self {
            codename: codename.into(),
            name: name.into(),
            app_label: app_label.into(),
        }
    }

    /// Returns the permission string in `"app_label.codename"` format.
    pub fn full_codename(&self) -> String {
        format!("{}.{}", self.app_label, self.codename)
    }
}

/// A group of users with shared permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// The group name.
    pub name: String,
    /// Permissions assigned to this group.
    pub permissions: Vec<Permission>,
}

impl Group {
    /// Creates a new group with the given name and no permissions.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            permissions: Vec::new(),
        }
    }

    /// Adds a permission to this group.
    pub fn add_permission(&mut self, permission: Permission) {
        if !self.permissions.contains(&permission) {
            self.permissions.push(permission);
        }
    }

    /// Builder form of [`add_permission`](Self::add_permission).
    #[must_use]
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.add_permission(permission);
        self
    }

    /// Returns all permission strings in `"app_label.codename"` format.
    pub fn get_permissions(&self) -> HashSet<String> {
        self.permissions
            .iter()
            .map(Permission::full_codename)
            .collect()
    }
}

/// Checks if a user has a specific permission.
///
/// Superusers have every permission; inactive users have none.
pub fn has_perm(user: &User, perm: &str) -> bool {
    has_perm_with_groups(user, perm, &[])
}

/// Checks if a user has all of the given permissions.
pub fn has_perms(user: &User, perms: &[&str]) -> bool {
    if !user.is_active {
        return false;
    }
    if user.is_superuser {
        return true;
    }
    let all_perms = get_all_permissions(user);
    perms.iter().all(|p| all_perms.contains(*p))
}

/// Returns the user's direct permissions.
pub fn get_all_permissions(user: &User) -> HashSet<String> {
    user.user_permissions.iter().cloned().collect()
}

/// Returns direct permissions plus those of the listed groups the user belongs to.
pub fn get_all_permissions_with_groups(user: &User, groups: &[Group]) -> HashSet<String> {
    let mut perms = get_all_permissions(user);
    for group in groups.iter().filter(|g| user.groups.contains(&g.name)) {
        perms.extend(group.get_permissions());
    }
    perms
}

/// Checks if a user has a specific permission, considering group memberships.
pub fn has_perm_with_groups(user: &User, perm: &str, groups: &[Group]) -> bool {
    if !user.is_active {
        return false;
    }
    if user.is_superuser {
        return true;
    }
    get_all_permissions_with_groups(user, groups).contains(perm)
}

/// Generates the default permissions for a model (add, change, delete, view).
pub fn generate_default_permissions(meta: &ModelMeta) -> Vec<Permission> {
    DEFAULT_ACTIONS
        .iter()
        .map(|action| {
            Permission::new(
                meta.permission_codename(action),
                format!("Can {action} {}", meta.verbose_name),
                meta.app_label.clone(),
            )
        })
        .collect()
}

/// Returns the permission string needed to modify rows of `meta`.
pub fn change_permission(meta: &ModelMeta) -> String {
    format!("{}.{}", meta.app_label, meta.permission_codename("change"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> ModelMeta {
        ModelMeta::new("schedule", "program")
    }

    // ── Permission tests ────────────────────────────────────────────

    #[test]
    fn test_permission_full_codename() {
        let perm = Permission::new("change_program", "Can change program", "schedule");
        assert_eq!(perm.full_codename(), "schedule.change_program");
    }

    #[test]
    fn test_generate_default_permissions() {
        let perms = generate_default_permissions(&program().with_verbose_name("TV program"));
        let codes: Vec<String> = perms.iter().map(Permission::full_codename).collect();
        assert_eq!(
            codes,
            [
                "schedule.add_program",
                "schedule.change_program",
                "schedule.delete_program",
                "schedule.view_program"
            ]
        );
        assert_eq!(perms[1].name, "Can change TV program");
    }

    #[test]
    fn test_change_permission() {
        assert_eq!(change_permission(&program()), "schedule.change_program");
    }

    // ── Group tests ─────────────────────────────────────────────────

    #[test]
    fn test_group_add_permission_dedupes() {
        let perm = Permission::new("change_program", "Can change program", "schedule");
        let mut group = Group::new("editors").with_permission(perm.clone());
        group.add_permission(perm);
        assert_eq!(group.permissions.len(), 1);
        assert!(group.get_permissions().contains("schedule.change_program"));
    }

    // ── Check tests ─────────────────────────────────────────────────

    #[test]
    fn test_has_perm_direct() {
        let user = User::new("alice").with_permission("schedule.change_program");
        assert!(has_perm(&user, "schedule.change_program"));
        assert!(!has_perm(&user, "schedule.delete_program"));
    }

    #[test]
    fn test_inactive_user_has_nothing() {
        let user = User::new("alice")
            .with_permission("schedule.change_program")
            .with_active(false);
        assert!(!has_perm(&user, "schedule.change_program"));
        assert!(!has_perms(&user, &["schedule.change_program"]));
    }

    #[test]
    fn test_has_perms_requires_all() {
        let user = User::new("alice").with_permission("schedule.view_program");
        assert!(has_perms(&user, &["schedule.view_program"]));
        assert!(!has_perms(&user, &["schedule.view_program", "schedule.change_program"]));
        assert!(has_perms(&user, &[]));
    }

    #[test]
    fn test_group_permissions() {
        let groups = vec![
            Group::new("editors").with_permission(Permission::new(
                "change_program",
                "Can change program",
                "schedule",
            )),
            Group::new("viewers"),
        ];
        let editor = User::new("ed").with_group("editors");
        let viewer = User::new("vi").with_group("viewers");
        assert!(has_perm_with_groups(&editor, "schedule.change_program", &groups));
        assert!(!has_perm_with_groups(&viewer, "schedule.change_program", &groups));
        assert!(!has_perm(&editor, "schedule.change_program"));
        assert_eq!(get_all_permissions_with_groups(&editor, &groups).len(), 1);
    }
}
