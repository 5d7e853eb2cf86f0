//! The acting principal of a request.
//!
//! A [`User`] travels in the request extensions. Views and predicates read
//! it from there; a request without one is treated as anonymous.

use serde::{Deserialize, Serialize};

/// An authenticated or anonymous user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// The user's unique username. Empty for anonymous users.
    pub username: String,
    /// Whether the account is active. Inactive users hold no permissions.
    pub is_active: bool,
    /// Whether the user may access staff-only areas.
    pub is_staff: bool,
    /// Whether the user holds every permission.
    pub is_superuser: bool,
    /// Group names this user belongs to.
    pub groups: Vec<String>,
    /// Permission strings (`"app_label.codename"`) assigned directly.
    pub user_permissions: Vec<String>,
    authenticated: bool,
}

impl User {
    /// Creates an active, authenticated user with no permissions.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            is_active: true,
            is_staff: false,
            is_superuser: false,
            groups: Vec::new(),
            user_permissions: Vec::new(),
            authenticated: true,
        }
    }

    /// Creates the anonymous user.
    pub fn anonymous() -> Self {
        Self {
            username: String::new(),
            is_active: false,
            is_staff: false,
            is_superuser: false,
            groups: Vec::new(),
            user_permissions: Vec::new(),
            authenticated: false,
        }
    }

    /// Creates an active superuser.
    pub fn superuser(username: impl Into<String>) -> Self {
        Self {
            is_staff: true,
            is_superuser: true,
            ..Self::new(username)
        }
    }

    /// Grants a permission directly.
    #[must_use]
    pub fn with_permission(mut self, perm: impl Into<String>) -> Self {
        let perm = perm.into();
        if !self.user_permissions.contains(&perm) {
            self.user_permissions.push(perm);
        }
        self
    }

    /// Adds the user to a group.
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        let group = group.into();
        if !self.groups.contains(&group) {
            self.groups.push(group);
        }
        self
    }

    /// Sets whether the account is active.
    #[must_use]
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Returns the username.
    pub fn get_username(&self) -> &str {
        &self.username
    }

    /// Returns `true` unless this is the anonymous user.
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Returns `true` for the anonymous user.
    pub const fn is_anonymous(&self) -> bool {
        !self.authenticated
    }

    /// Checks a single permission. See [`crate::permissions::has_perm`].
    pub fn has_perm(&self, perm: &str) -> bool {
        crate::permissions::has_perm(self, perm)
    }

    /// Checks that every permission is held.
    pub fn has_perms(&self, perms: &[&str]) -> bool {
        crate::permissions::has_perms(self, perms)
    }
}

impl Default for User {
    fn default() -> Self {
        Self::anonymous()
    }
}
