//! # inline-edit
//!
//! Inline formsets and conditional edit/detail dispatch for django-style
//! Rust web applications.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient
//! access. Depend on `inline-edit` to get everything, or on the individual
//! crates for finer-grained control.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use inline_edit::prelude::*;
//!
//! let program = ModelMeta::new("schedule", "program");
//! let image = ModelMeta::new("schedule", "image");
//! let store = Arc::new(MemoryStore::new());
//!
//! let form = InlineModelFormFactory::new(
//!     BaseModelFormFactory::new(
//!         program.clone(),
//!         vec![FormFieldDef::new("name", FormFieldType::text())],
//!     ),
//!     InlineDeclarations::new().inline(
//!         "images",
//!         inline_formset_factory(
//!             image,
//!             "program",
//!             vec![FormFieldDef::new("caption", FormFieldType::text())],
//!         ),
//!     ),
//! );
//!
//! let edit_or_show: ViewFunction = inline_update_view(
//!     UpdateViewFactory::new(form, store.clone()),
//!     DetailViewFactory::new(program, store),
//!     Arc::new(ModelPermissionAuthorizer::new()),
//! )
//! .as_view(DispatchConfig::new().option("success_url", "/programs/{pk}/"))
//! .expect("registration");
//! ```

/// Error types, settings, logging, and model metadata.
pub use inline_edit_core as core;

/// HTTP layer: Request, Response, `QueryDict`.
#[cfg(feature = "http")]
pub use inline_edit_http as http;

/// Forms, formsets, model forms, and inline formsets.
#[cfg(feature = "forms")]
pub use inline_edit_forms as forms;

/// Users, permissions, groups, and the authorizer.
#[cfg(feature = "auth")]
pub use inline_edit_auth as auth;

/// Class-based views, generic views, and conditional dispatch.
#[cfg(feature = "views")]
pub use inline_edit_views as views;

/// Third-party crates re-exported for convenience.
pub use async_trait;
pub use axum;
pub use serde;
pub use serde_json;
pub use tokio;
pub use tracing;
pub use tracing_subscriber;

/// The most commonly used types, for glob import.
pub mod prelude {
    pub use inline_edit_core::{
        InlineEditError, InlineEditResult, ModelInstance, ModelMeta, Settings, SETTINGS,
    };

    #[cfg(feature = "http")]
    pub use inline_edit_http::{HttpRequest, HttpResponse, HttpResponseRedirect, QueryDict};

    #[cfg(feature = "forms")]
    pub use inline_edit_forms::{
        inline_formset_factory, BaseForm, BaseModelFormFactory, Form, FormFieldDef,
        FormFieldType, FormSet, InlineDeclarations, InlineModelForm, InlineModelFormFactory,
        MemoryStore, ModelForm, ModelFormFactory, ModelStore,
    };

    #[cfg(feature = "auth")]
    pub use inline_edit_auth::{Authorizer, ModelPermissionAuthorizer, User};

    #[cfg(feature = "views")]
    pub use inline_edit_views::{
        conditional_dispatch, inline_update_view, permission_predicate, predicate,
        ConditionalDispatchView, DetailViewFactory, DispatchConfig, DispatchMeta,
        UpdateViewFactory, View, ViewFactory, ViewFunction, ViewOptions,
    };
}
