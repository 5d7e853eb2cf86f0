//! The authorization collaborator consulted by permission-based predicates.
//!
//! An [`Authorizer`] answers two questions: which capability is needed to
//! modify a resource type, and whether a principal holds a capability.
//! [`ModelPermissionAuthorizer`] answers them with model permissions.

use inline_edit_core::ModelMeta;

use crate::permissions::{has_perm_with_groups, Group};
use crate::user::User;

/// Maps resource types to capabilities and checks principals against them.
pub trait Authorizer: Send + Sync {
    /// Returns the capability needed to modify rows of `meta`.
    fn required_capability(&self, meta: &ModelMeta) -> String;

    /// Returns `true` if `user` holds `capability`.
    fn principal_has_capability(&self, user: &User, capability: &str) -> bool;
}

/// An [`Authorizer`] backed by `"app_label.{action}_{model}"` permissions.
///
/// # Examples
///
/// ```
/// use inline_edit_auth::{Authorizer, ModelPermissionAuthorizer, User};
/// use inline_edit_core::ModelMeta;
///
/// let authorizer = ModelPermissionAuthorizer::new();
/// let capability = authorizer.required_capability(&ModelMeta::new("schedule", "program"));
/// assert_eq!(capability, "schedule.change_program");
///
/// let editor = User::new("ed").with_permission("schedule.change_program");
/// assert!(authorizer.principal_has_capability(&editor, &capability));
/// ```
#[derive(Debug, Clone)]
pub struct ModelPermissionAuthorizer {
    action: String,
    groups: Vec<Group>,
}

impl ModelPermissionAuthorizer {
    /// Creates an authorizer requiring the `change` permission.
    pub fn new() -> Self {
        Self {
            action: "change".to_string(),
            groups: Vec::new(),
        }
    }

    /// Requires a different action's permission (e.g. `"delete"`).
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = action.into();
        self
    }

    /// Resolves group memberships against `groups`.
    #[must_use]
    pub fn with_groups(mut self, groups: Vec<Group>) -> Self {
        self.groups = groups;
        self
    }

    /// Returns the required action.
    pub fn action(&self) -> &str {
        &self.action
    }
}

impl Default for ModelPermissionAuthorizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Authorizer for ModelPermissionAuthorizer {
    fn required_capability(&self, meta: &ModelMeta) -> String {
        format!("{}.{}", meta.app_label, meta.permission_codename(&self.action))
    }

    fn principal_has_capability(&self, user: &User, capability: &str) -> bool {
        let allowed = has_perm_with_groups(user, capability, &self.groups);
        tracing::trace!(user = %user.username, capability, allowed, "Checked capability");
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Permission;

    fn program() -> ModelMeta {
        ModelMeta::new("schedule", "program")
    }

    #[test]
    fn test_default_action_is_change() {
        let authorizer = ModelPermissionAuthorizer::default();
        assert_eq!(authorizer.action(), "change");
        assert_eq!(authorizer.required_capability(&program()), "schedule.change_program");
    }

    #[test]
    fn test_custom_action() {
        let authorizer = ModelPermissionAuthorizer::new().with_action("delete");
        assert_eq!(authorizer.required_capability(&program()), "schedule.delete_program");
    }

    #[test]
    fn test_anonymous_and_superuser() {
        let authorizer = ModelPermissionAuthorizer::new();
        let capability = authorizer.required_capability(&program());
        assert!(!authorizer.principal_has_capability(&User::anonymous(), &capability));
        assert!(authorizer.principal_has_capability(&User::superuser("root"), &capability));
    }

    #[test]
    fn test_groups_are_resolved() {
        let authorizer = ModelPermissionAuthorizer::new().with_groups(vec![Group::new("editors")
            .with_permission(Permission::new("change_program", "Can change program", "schedule"))]);
        let capability = authorizer.required_capability(&program());
        assert!(authorizer.principal_has_capability(&User::new("ed").with_group("editors"), &capability));
        assert!(!authorizer.principal_has_capability(&User::new("vi"), &capability));
    }
}
