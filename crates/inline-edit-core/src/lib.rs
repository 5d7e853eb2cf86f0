//! # inline-edit-core
//!
//! Core types shared by every inline-edit-rs crate. This crate has no
//! framework dependencies of its own.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Library settings and global configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON, and the environment
//! - [`logging`] - Tracing-based logging integration
//! - [`model`] - Model metadata and persisted record instances

pub mod error;
pub mod logging;
pub mod model;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{InlineEditError, InlineEditResult, ValidationError};
pub use model::{ModelInstance, ModelMeta};
pub use settings::{Settings, SETTINGS};
