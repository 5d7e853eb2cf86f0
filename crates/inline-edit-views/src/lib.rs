//! # inline-edit-views
//!
//! The view layer of inline-edit-rs: class-based views, view functions and
//! their decorators, option maps, view factories, the generic detail and
//! update views, and the conditional dispatcher that routes a request to an
//! edit or a read-only view.
//!
//! ## Modules
//!
//! - [`options`] - Named, ordered view options shared between branches
//! - [`views::class_based`] - The [`View`] trait and rendering mixins
//! - [`views::function`] - [`ViewFunction`] and decorators
//! - [`views::factory`] - [`ViewFactory`], the registration-time view builder
//! - [`views::generic`] - [`DetailView`] and [`UpdateView`]
//! - [`views::conditional`] - [`ConditionalDispatchView`] and helpers
//! - [`server`] - Serving a [`ViewFunction`] through axum

pub mod options;
pub mod server;
pub mod views;

pub use options::{OptionValue, ViewOptions};
pub use views::class_based::{ContextMixin, TemplateResponseMixin, View};
pub use views::conditional::{
    conditional_dispatch, inline_update_view, permission_predicate, predicate,
    predicate_factory, ConditionalDispatchView, DispatchConfig, DispatchHandler, DispatchMeta,
    Predicate, PredicateFactory,
};
pub use views::factory::{FnViewFactory, ViewFactory};
pub use views::function::{
    login_required, request_user, require_get, require_http_methods, require_post, ViewFunction,
};
pub use views::generic::{DetailView, DetailViewFactory, UpdateView, UpdateViewFactory};
