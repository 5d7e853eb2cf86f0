//! Conditional dispatch between two views.
//!
//! A [`ConditionalDispatchView`] routes each request to one of two views,
//! typically an edit form for users allowed to change a record and a
//! read-only page for everyone else. Both views are built once, at
//! registration, from two [`ViewFactory`]s and a shared [`ViewOptions`] map;
//! each factory only receives the options it recognizes.
//!
//! The predicate deciding between the branches is either given directly or
//! produced by a [`PredicateFactory`] from the resource types of the two
//! built views. [`permission_predicate`] is the usual choice: it checks that
//! the request's [`User`] may modify the true branch's model.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use inline_edit_core::ModelMeta;
//! use inline_edit_forms::{BaseModelFormFactory, FormFieldDef, FormFieldType, MemoryStore};
//! use inline_edit_auth::ModelPermissionAuthorizer;
//! use inline_edit_views::{inline_update_view, DetailViewFactory, DispatchConfig, UpdateViewFactory};
//!
//! let meta = ModelMeta::new("schedule", "program");
//! let store = Arc::new(MemoryStore::new());
//! let form = BaseModelFormFactory::new(
//!     meta.clone(),
//!     vec![FormFieldDef::new("name", FormFieldType::text())],
//! );
//!
//! let view = inline_update_view(
//!     UpdateViewFactory::new(form, store.clone()),
//!     DetailViewFactory::new(meta, store),
//!     Arc::new(ModelPermissionAuthorizer::new()),
//! );
//! let handler = view
//!     .build(DispatchConfig::new().option("success_url", "/programs/"))
//!     .unwrap();
//! assert_eq!(handler.name(), "InlineUpdateView");
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use inline_edit_auth::{Authorizer, User};
use inline_edit_core::logging::registration_span;
use inline_edit_core::{InlineEditError, InlineEditResult, ModelMeta, SETTINGS};
use inline_edit_http::{HttpRequest, HttpResponse};

use super::class_based::View;
use super::factory::ViewFactory;
use super::function::{request_user, ViewFunction};
use super::generic::{DetailViewFactory, UpdateViewFactory};
use crate::options::{OptionValue, ViewOptions};

/// Decides which branch handles a request. Must not have side effects.
pub type Predicate = Arc<dyn Fn(&HttpRequest) -> bool + Send + Sync>;

/// Produces a [`Predicate`] from the resource types of the two built views.
///
/// Returning `None` means no usable predicate could be made; registration
/// then fails with [`InlineEditError::TypeConfiguration`].
pub trait PredicateFactory: Send + Sync {
    /// Makes the predicate for a dispatch between views over `true_model`
    /// and `false_model`.
    fn make_predicate(
        &self,
        true_model: Option<&ModelMeta>,
        false_model: Option<&ModelMeta>,
    ) -> Option<Predicate>;
}

impl<F> PredicateFactory for F
where
    F: Fn(Option<&ModelMeta>, Option<&ModelMeta>) -> Option<Predicate> + Send + Sync,
{
    fn make_predicate(
        &self,
        true_model: Option<&ModelMeta>,
        false_model: Option<&ModelMeta>,
    ) -> Option<Predicate> {
        self(true_model, false_model)
    }
}

/// Wraps a closure as a [`Predicate`].
pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&HttpRequest) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a shared [`PredicateFactory`].
pub fn predicate_factory<F>(f: F) -> Arc<dyn PredicateFactory>
where
    F: Fn(Option<&ModelMeta>, Option<&ModelMeta>) -> Option<Predicate> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Declared defaults of a [`ConditionalDispatchView`].
///
/// Every field is optional. A branch or predicate given in the
/// [`DispatchConfig`] at the call site replaces the same field declared
/// here. A predicate from either place is used before any predicate
/// factory, so a declared `predicate` wins over a call-site
/// `predicate_factory`.
#[derive(Clone, Default)]
pub struct DispatchMeta {
    /// Builds the view used when the predicate holds.
    pub true_view: Option<Arc<dyn ViewFactory>>,
    /// Builds the view used when the predicate does not hold.
    pub false_view: Option<Arc<dyn ViewFactory>>,
    /// The default predicate.
    pub predicate: Option<Predicate>,
    /// Makes the predicate when none is given.
    pub predicate_factory: Option<Arc<dyn PredicateFactory>>,
}

impl DispatchMeta {
    /// Creates empty defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default true branch.
    #[must_use]
    pub fn true_view(mut self, factory: impl ViewFactory + 'static) -> Self {
        self.true_view = Some(Arc::new(factory));
        self
    }

    /// Sets the default false branch.
    #[must_use]
    pub fn false_view(mut self, factory: impl ViewFactory + 'static) -> Self {
        self.false_view = Some(Arc::new(factory));
        self
    }

    /// Sets the default predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Sets the default predicate factory.
    #[must_use]
    pub fn predicate_factory(mut self, factory: Arc<dyn PredicateFactory>) -> Self {
        self.predicate_factory = Some(factory);
        self
    }
}

impl fmt::Debug for DispatchMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchMeta")
            .field("true_view", &self.true_view.as_ref().map(|v| v.name().to_string()))
            .field("false_view", &self.false_view.as_ref().map(|v| v.name().to_string()))
            .field("predicate", &self.predicate.is_some())
            .field("predicate_factory", &self.predicate_factory.is_some())
            .finish()
    }
}

/// Call-site arguments of [`ConditionalDispatchView::build`].
#[derive(Clone, Default)]
pub struct DispatchConfig {
    /// Overrides the declared true branch.
    pub true_view: Option<Arc<dyn ViewFactory>>,
    /// Overrides the declared false branch.
    pub false_view: Option<Arc<dyn ViewFactory>>,
    /// Overrides the declared predicate.
    pub predicate: Option<Predicate>,
    /// Overrides the declared predicate factory.
    pub predicate_factory: Option<Arc<dyn PredicateFactory>>,
    /// Shared options, merged over the declared ones.
    pub options: ViewOptions,
}

impl DispatchConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the true branch.
    #[must_use]
    pub fn true_view(mut self, factory: impl ViewFactory + 'static) -> Self {
        self.true_view = Some(Arc::new(factory));
        self
    }

    /// Sets the false branch.
    #[must_use]
    pub fn false_view(mut self, factory: impl ViewFactory + 'static) -> Self {
        self.false_view = Some(Arc::new(factory));
        self
    }

    /// Sets the predicate.
    #[must_use]
    pub fn predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Sets the predicate factory.
    #[must_use]
    pub fn predicate_factory(mut self, factory: Arc<dyn PredicateFactory>) -> Self {
        self.predicate_factory = Some(factory);
        self
    }

    /// Adds a shared option.
    #[must_use]
    pub fn option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name, value);
        self
    }

    /// Replaces the shared options.
    #[must_use]
    pub fn options(mut self, options: ViewOptions) -> Self {
        self.options = options;
        self
    }
}

/// A view that forwards each request to one of two views.
///
/// Holds the declared defaults ([`DispatchMeta`] and shared options);
/// [`build`](Self::build) resolves them against a [`DispatchConfig`] into a
/// [`DispatchHandler`].
#[derive(Debug, Clone)]
pub struct ConditionalDispatchView {
    name: String,
    meta: DispatchMeta,
    options: ViewOptions,
}

impl ConditionalDispatchView {
    /// Creates a dispatcher named `name` with no declared defaults.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meta: DispatchMeta::default(),
            options: ViewOptions::new(),
        }
    }

    /// Sets the declared defaults.
    #[must_use]
    pub fn with_meta(mut self, meta: DispatchMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Declares a shared option.
    #[must_use]
    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(name, value);
        self
    }

    /// Returns the name used in logs and error messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared defaults.
    pub const fn meta(&self) -> &DispatchMeta {
        &self.meta
    }

    /// Returns the declared shared options.
    pub const fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Resolves both branches and the predicate, building both views.
    ///
    /// # Errors
    ///
    /// - [`InlineEditError::ImproperlyConfigured`] when a branch or the
    ///   predicate cannot be resolved, or a factory rejects its options.
    /// - [`InlineEditError::TypeConfiguration`] when a shared option is not
    ///   comparable or the predicate factory produces no predicate.
    pub fn build(&self, config: DispatchConfig) -> InlineEditResult<DispatchHandler> {
        let span = registration_span(&self.name);
        let _guard = span.enter();

        let true_factory = config
            .true_view
            .or_else(|| self.meta.true_view.clone())
            .ok_or_else(|| self.missing_branch("True", "true_view"))?;
        let false_factory = config
            .false_view
            .or_else(|| self.meta.false_view.clone())
            .ok_or_else(|| self.missing_branch("False", "false_view"))?;

        let options = ViewOptions::merged(&self.options, &config.options, &self.name)?;
        let true_view = build_branch(true_factory.as_ref(), &options)?;
        let false_view = build_branch(false_factory.as_ref(), &options)?;

        let predicate = match config.predicate.or_else(|| self.meta.predicate.clone()) {
            Some(predicate) => predicate,
            None => {
                let factory = config
                    .predicate_factory
                    .or_else(|| self.meta.predicate_factory.clone())
                    .ok_or_else(|| {
                        InlineEditError::ImproperlyConfigured(format!(
                            "{} has no predicate. Provide `predicate` or `predicate_factory` \
                             in the call or in its DispatchMeta.",
                            self.name
                        ))
                    })?;
                factory
                    .make_predicate(true_view.model(), false_view.model())
                    .ok_or_else(|| {
                        InlineEditError::TypeConfiguration(format!(
                            "The predicate_factory of {} did not produce a callable predicate",
                            self.name
                        ))
                    })?
            }
        };

        tracing::info!(
            view = %self.name,
            true_view = true_factory.name(),
            false_view = false_factory.name(),
            options = options.len(),
            "conditional view registered"
        );

        Ok(DispatchHandler {
            name: self.name.clone(),
            true_view: Arc::from(true_view),
            false_view: Arc::from(false_view),
            predicate,
        })
    }

    /// Builds the handler and wraps it as a [`ViewFunction`].
    pub fn as_view(&self, config: DispatchConfig) -> InlineEditResult<ViewFunction> {
        Ok(self.build(config)?.as_view())
    }

    fn missing_branch(&self, outcome: &str, field: &str) -> InlineEditError {
        InlineEditError::ImproperlyConfigured(format!(
            "No view to direct to when the condition returns {outcome}. \
             Provide `{field}` in the call or in the DispatchMeta of {}.",
            self.name
        ))
    }
}

fn build_branch(factory: &dyn ViewFactory, options: &ViewOptions) -> InlineEditResult<Box<dyn View>> {
    let accepted = options.filtered(|name| {
        let accepts = factory.accepts_option(name);
        tracing::trace!(view = factory.name(), option = name, accepts, "filtering shared option");
        accepts
    });
    factory.build(&accepted)
}

/// The resolved dispatch: two built views and the predicate choosing
/// between them. Immutable; clones share the views.
#[derive(Clone)]
pub struct DispatchHandler {
    name: String,
    true_view: Arc<dyn View>,
    false_view: Arc<dyn View>,
    predicate: Predicate,
}

impl DispatchHandler {
    /// Returns the registration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the view used when the predicate holds.
    pub fn true_view(&self) -> &dyn View {
        self.true_view.as_ref()
    }

    /// Returns the view used when the predicate does not hold.
    pub fn false_view(&self) -> &dyn View {
        self.false_view.as_ref()
    }

    /// Evaluates the predicate for `request`.
    pub fn evaluate(&self, request: &HttpRequest) -> bool {
        (self.predicate)(request)
    }
}

impl fmt::Debug for DispatchHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchHandler")
            .field("name", &self.name)
            .field("true_model", &self.true_view.model())
            .field("false_model", &self.false_view.model())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl View for DispatchHandler {
    /// Methods at least one branch serves.
    ///
    /// Requests, OPTIONS and 405 answers included, are still forwarded to
    /// the branch the predicate picks, so their `Allow` header lists that
    /// branch's methods only.
    fn allowed_methods(&self) -> Vec<http::Method> {
        let mut methods = self.true_view.allowed_methods();
        for method in self.false_view.allowed_methods() {
            if !methods.contains(&method) {
                methods.push(method);
            }
        }
        methods
    }

    fn model(&self) -> Option<&ModelMeta> {
        self.true_view.model().or_else(|| self.false_view.model())
    }

    async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let outcome = self.evaluate(&request);
        tracing::debug!(
            view = %self.name,
            outcome,
            method = %request.method(),
            path = request.path(),
            "conditional dispatch"
        );
        if outcome {
            self.true_view.dispatch(request).await
        } else {
            self.false_view.dispatch(request).await
        }
    }
}

/// Dispatches between two view functions on `predicate`.
pub fn conditional_dispatch(
    predicate: Predicate,
    true_view: ViewFunction,
    false_view: ViewFunction,
) -> ViewFunction {
    let true_view = Arc::new(true_view);
    let false_view = Arc::new(false_view);

    Box::new(move |request: HttpRequest| {
        if predicate(&request) {
            true_view(request)
        } else {
            false_view(request)
        }
    })
}

/// A [`PredicateFactory`] checking that the request's user may modify the
/// true branch's model (the false branch's when the true one has none).
///
/// Requests without an authenticated [`User`] extension take the false
/// branch.
pub fn permission_predicate(authorizer: Arc<dyn Authorizer>) -> Arc<dyn PredicateFactory> {
    predicate_factory(move |true_model, false_model| {
        let model = true_model.or(false_model)?;
        let capability = authorizer.required_capability(model);
        let authorizer = authorizer.clone();
        Some(predicate(move |request: &HttpRequest| {
            request_user(request)
                .filter(|user| user.is_authenticated())
                .is_some_and(|user: &User| authorizer.principal_has_capability(user, &capability))
        }))
    })
}

/// A dispatcher that shows an edit form to users allowed to change the
/// record and a read-only detail page to everyone else.
///
/// Declares `template_name_suffix` from
/// [`Settings::inline_template_name_suffix`](inline_edit_core::Settings) so
/// both branches render the same inline template by default.
pub fn inline_update_view(
    update: UpdateViewFactory,
    detail: DetailViewFactory,
    authorizer: Arc<dyn Authorizer>,
) -> ConditionalDispatchView {
    ConditionalDispatchView::new("InlineUpdateView")
        .with_meta(
            DispatchMeta::new()
                .true_view(update)
                .false_view(detail)
                .predicate_factory(permission_predicate(authorizer)),
        )
        .with_option(
            "template_name_suffix",
            SETTINGS.get().inline_template_name_suffix.as_str(),
        )
}
