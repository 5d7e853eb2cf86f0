//! # inline-edit-auth
//!
//! Users, permissions and groups, plus the [`Authorizer`] collaborator used
//! by permission-based dispatch predicates.
//!
//! - **User** with direct permissions, group names and an anonymous form (`user`)
//! - **Permission and group checks** (`permissions`)
//! - **Authorization collaborator** mapping models to capabilities (`authorizer`)

pub mod authorizer;
pub mod permissions;
pub mod user;

pub use authorizer::{Authorizer, ModelPermissionAuthorizer};
pub use permissions::{
    change_permission, generate_default_permissions, has_perm, has_perms, Group, Permission,
};
pub use user::User;
