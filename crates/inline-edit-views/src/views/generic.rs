//! Generic single-object views.
//!
//! [`DetailView`] shows one record read-only; [`UpdateView`] shows a model
//! form for it and saves submitted data. Both look the record up by the
//! primary key in the route's `pk_url_kwarg` keyword and render through the
//! JSON-in-HTML fallback of
//! [`TemplateResponseMixin`].
//!
//! The views are configured from a [`ViewOptions`] map by their factories,
//! [`DetailViewFactory`] and [`UpdateViewFactory`], which also hold the
//! [`ModelStore`] and (for updates) the [`ModelFormFactory`].
//!
//! | option | detail | update | default |
//! |---|---|---|---|
//! | `model` | yes | yes | the factory's model |
//! | `template_name` | yes | yes | `{app_label}/{model_name}{suffix}.html` |
//! | `template_name_suffix` | yes | yes | `_detail` / `_form` |
//! | `context_object_name` | yes | yes | the model name |
//! | `pk_url_kwarg` | yes | yes | `pk` |
//! | `extra_context` | yes | yes | none |
//! | `success_url` | no | yes | none |

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use inline_edit_core::{InlineEditError, InlineEditResult, ModelInstance, ModelMeta};
use inline_edit_forms::{ModelFormFactory, ModelStore};
use inline_edit_http::{HttpRequest, HttpResponse, HttpResponseRedirect};

use super::class_based::{ContextMixin, TemplateResponseMixin, View};
use super::factory::ViewFactory;
use crate::options::ViewOptions;

/// Options understood by [`DetailView`].
pub const DETAIL_VIEW_OPTIONS: [&str; 6] = [
    "model",
    "template_name",
    "template_name_suffix",
    "context_object_name",
    "pk_url_kwarg",
    "extra_context",
];

/// Options understood by [`UpdateView`].
pub const UPDATE_VIEW_OPTIONS: [&str; 7] = [
    "model",
    "template_name",
    "template_name_suffix",
    "context_object_name",
    "pk_url_kwarg",
    "extra_context",
    "success_url",
];

/// Configuration shared by the single-object views.
#[derive(Debug, Clone)]
struct SingleObject {
    meta: ModelMeta,
    template_name: Option<String>,
    template_name_suffix: String,
    context_object_name: Option<String>,
    pk_url_kwarg: String,
    extra_context: BTreeMap<String, Value>,
}

impl SingleObject {
    fn new(meta: ModelMeta, template_name_suffix: &str) -> Self {
        Self {
            meta,
            template_name: None,
            template_name_suffix: template_name_suffix.to_string(),
            context_object_name: None,
            pk_url_kwarg: "pk".to_string(),
            extra_context: BTreeMap::new(),
        }
    }

    fn configure(mut self, view: &str, options: &ViewOptions) -> InlineEditResult<Self> {
        if let Some(label) = string_option(view, options, "model")? {
            if label != self.meta.label() {
                return Err(InlineEditError::ImproperlyConfigured(format!(
                    "{view} is bound to {}; it cannot serve {label}",
                    self.meta
                )));
            }
        }
        if let Some(name) = string_option(view, options, "template_name")? {
            self.template_name = Some(name);
        }
        if let Some(suffix) = string_option(view, options, "template_name_suffix")? {
            self.template_name_suffix = suffix;
        }
        if let Some(name) = string_option(view, options, "context_object_name")? {
            self.context_object_name = Some(name);
        }
        if let Some(kwarg) = string_option(view, options, "pk_url_kwarg")? {
            self.pk_url_kwarg = kwarg;
        }
        match options.get("extra_context") {
            None => {}
            Some(value) => match value.as_json() {
                Some(Value::Object(map)) => {
                    self.extra_context = map.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
                }
                _ => {
                    return Err(InlineEditError::ImproperlyConfigured(format!(
                        "{view} option 'extra_context' must be a JSON object"
                    )))
                }
            },
        }
        Ok(self)
    }

    fn template_name(&self) -> String {
        self.template_name.clone().unwrap_or_else(|| {
            format!(
                "{}/{}{}.html",
                self.meta.app_label, self.meta.model_name, self.template_name_suffix
            )
        })
    }

    fn context_object_name(&self) -> &str {
        self.context_object_name
            .as_deref()
            .unwrap_or(&self.meta.model_name)
    }

    async fn get_object(
        &self,
        request: &HttpRequest,
        store: &dyn ModelStore,
    ) -> InlineEditResult<ModelInstance> {
        let raw = request.route().kwarg(&self.pk_url_kwarg).ok_or_else(|| {
            InlineEditError::ImproperlyConfigured(format!(
                "Generic view for {} must be called with an object pk in the URL keyword '{}'",
                self.meta, self.pk_url_kwarg
            ))
        })?;
        let pk: i64 = raw.parse().map_err(|_| {
            InlineEditError::NotFound(format!(
                "No {} found matching the query",
                self.meta.verbose_name
            ))
        })?;
        store.get(&self.meta, pk).await
    }

    fn object_context(&self, object: &ModelInstance) -> BTreeMap<String, Value> {
        let json = object.to_json();
        let mut context = BTreeMap::new();
        context.insert("object".to_string(), json.clone());
        context.insert(self.context_object_name().to_string(), json);
        context
    }

    fn base_context(&self) -> BTreeMap<String, Value> {
        let mut context = BTreeMap::new();
        context.insert("model".to_string(), Value::String(self.meta.label()));
        context.extend(self.extra_context.clone());
        context
    }
}

fn string_option(view: &str, options: &ViewOptions, name: &str) -> InlineEditResult<Option<String>> {
    match options.get(name) {
        None => Ok(None),
        Some(value) => value.as_str().map(|s| Some(s.to_string())).ok_or_else(|| {
            InlineEditError::ImproperlyConfigured(format!("{view} option '{name}' must be a string"))
        }),
    }
}

fn object_error_response(error: &InlineEditError) -> HttpResponse {
    match error {
        InlineEditError::NotFound(msg) | InlineEditError::DoesNotExist(msg) => {
            HttpResponse::not_found(msg.clone())
        }
        e if e.is_configuration_error() => HttpResponse::from_error(e),
        e => HttpResponse::server_error(format!("Error fetching object: {e}")),
    }
}

/// Substitutes `{pk}` and `{field}` placeholders with the saved record's values.
fn format_success_url(url: &str, object: &ModelInstance) -> String {
    let mut formatted = url.replace("{pk}", &object.pk.map_or_else(String::new, |pk| pk.to_string()));
    for (field, value) in &object.values {
        let placeholder = format!("{{{field}}}");
        if formatted.contains(&placeholder) {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            formatted = formatted.replace(&placeholder, &text);
        }
    }
    formatted
}

// ============================================================
// DetailView
// ============================================================

/// Displays a single record.
pub struct DetailView {
    object: SingleObject,
    store: Arc<dyn ModelStore>,
}

impl DetailView {
    /// Creates a detail view over `meta` with default options.
    pub fn new(meta: ModelMeta, store: Arc<dyn ModelStore>) -> Self {
        Self {
            object: SingleObject::new(meta, "_detail"),
            store,
        }
    }

    /// Creates a detail view configured by `options`.
    pub fn from_options(
        meta: ModelMeta,
        store: Arc<dyn ModelStore>,
        options: &ViewOptions,
    ) -> InlineEditResult<Self> {
        Ok(Self {
            object: SingleObject::new(meta, "_detail").configure("DetailView", options)?,
            store,
        })
    }

    /// Returns the URL keyword holding the primary key.
    pub fn pk_url_kwarg(&self) -> &str {
        &self.object.pk_url_kwarg
    }
}

impl ContextMixin for DetailView {
    fn get_context_data(&self, _kwargs: &HashMap<String, String>) -> BTreeMap<String, Value> {
        self.object.base_context()
    }
}

impl TemplateResponseMixin for DetailView {
    fn template_name(&self) -> String {
        self.object.template_name()
    }
}

#[async_trait]
impl View for DetailView {
    fn allowed_methods(&self) -> Vec<http::Method> {
        vec![http::Method::GET, http::Method::HEAD, http::Method::OPTIONS]
    }

    fn model(&self) -> Option<&ModelMeta> {
        Some(&self.object.meta)
    }

    async fn get(&self, request: HttpRequest) -> HttpResponse {
        match self.object.get_object(&request, self.store.as_ref()).await {
            Ok(object) => {
                let mut context = self.object.object_context(&object);
                context.extend(self.get_context_data(&request.route().kwargs));
                self.render_to_response(context)
            }
            Err(e) => object_error_response(&e),
        }
    }
}

/// Builds [`DetailView`]s for one model.
#[derive(Clone)]
pub struct DetailViewFactory {
    name: String,
    meta: ModelMeta,
    store: Arc<dyn ModelStore>,
}

impl DetailViewFactory {
    /// Creates a factory for `meta` reading from `store`.
    pub fn new(meta: ModelMeta, store: Arc<dyn ModelStore>) -> Self {
        Self {
            name: format!("DetailView({meta})"),
            meta,
            store,
        }
    }

    /// Returns the model the built views display.
    pub const fn model_meta(&self) -> &ModelMeta {
        &self.meta
    }
}

impl ViewFactory for DetailViewFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_option(&self, option: &str) -> bool {
        DETAIL_VIEW_OPTIONS.contains(&option)
    }

    fn build(&self, options: &ViewOptions) -> InlineEditResult<Box<dyn View>> {
        Ok(Box::new(DetailView::from_options(
            self.meta.clone(),
            self.store.clone(),
            options,
        )?))
    }
}

// ============================================================
// UpdateView
// ============================================================

/// Edits a single record through a model form.
///
/// GET renders the unbound form. POST binds the submitted data: an invalid
/// form is re-rendered with its errors, a valid one is saved and the client
/// is redirected to `success_url`.
pub struct UpdateView {
    object: SingleObject,
    store: Arc<dyn ModelStore>,
    form_factory: Arc<dyn ModelFormFactory>,
    success_url: Option<String>,
}

impl UpdateView {
    /// Creates an update view with default options.
    pub fn new(form_factory: Arc<dyn ModelFormFactory>, store: Arc<dyn ModelStore>) -> Self {
        Self {
            object: SingleObject::new(form_factory.model_meta().clone(), "_form"),
            store,
            form_factory,
            success_url: None,
        }
    }

    /// Creates an update view configured by `options`.
    pub fn from_options(
        form_factory: Arc<dyn ModelFormFactory>,
        store: Arc<dyn ModelStore>,
        options: &ViewOptions,
    ) -> InlineEditResult<Self> {
        let object = SingleObject::new(form_factory.model_meta().clone(), "_form")
            .configure("UpdateView", options)?;
        let success_url = string_option("UpdateView", options, "success_url")?;
        Ok(Self {
            object,
            store,
            form_factory,
            success_url,
        })
    }

    /// Returns the configured success URL, if any.
    pub fn success_url(&self) -> Option<&str> {
        self.success_url.as_deref()
    }

    fn render_form(&self, object: &ModelInstance, form: Value, request: &HttpRequest) -> HttpResponse {
        let mut context = self.object.object_context(object);
        context.insert("form".to_string(), form);
        context.extend(self.get_context_data(&request.route().kwargs));
        self.render_to_response(context)
    }
}

impl ContextMixin for UpdateView {
    fn get_context_data(&self, _kwargs: &HashMap<String, String>) -> BTreeMap<String, Value> {
        self.object.base_context()
    }
}

impl TemplateResponseMixin for UpdateView {
    fn template_name(&self) -> String {
        self.object.template_name()
    }
}

#[async_trait]
impl View for UpdateView {
    fn allowed_methods(&self) -> Vec<http::Method> {
        vec![
            http::Method::GET,
            http::Method::HEAD,
            http::Method::POST,
            http::Method::OPTIONS,
        ]
    }

    fn model(&self) -> Option<&ModelMeta> {
        Some(&self.object.meta)
    }

    async fn get(&self, request: HttpRequest) -> HttpResponse {
        let store = self.store.as_ref();
        let object = match self.object.get_object(&request, store).await {
            Ok(object) => object,
            Err(e) => return object_error_response(&e),
        };
        match self.form_factory.create(None, Some(object.clone()), store).await {
            Ok(form) => self.render_form(&object, form.as_context(), &request),
            Err(e) => HttpResponse::server_error(format!("Error building form: {e}")),
        }
    }

    async fn post(&self, request: HttpRequest) -> HttpResponse {
        let store = self.store.as_ref();
        let object = match self.object.get_object(&request, store).await {
            Ok(object) => object,
            Err(e) => return object_error_response(&e),
        };
        let mut form = match self
            .form_factory
            .create(Some(request.post()), Some(object.clone()), store)
            .await
        {
            Ok(form) => form,
            Err(e) => return HttpResponse::server_error(format!("Error building form: {e}")),
        };

        if !form.is_valid().await {
            return self.render_form(&object, form.as_context(), &request);
        }
        let Some(success_url) = self.success_url.as_deref() else {
            return HttpResponse::from_error(&InlineEditError::ImproperlyConfigured(
                "No URL to redirect to. Provide a success_url.".to_string(),
            ));
        };

        match form.save(store).await {
            Ok(saved) => {
                tracing::debug!(model = %self.object.meta, pk = ?saved.pk, "object updated");
                HttpResponseRedirect::new(&format_success_url(success_url, &saved))
            }
            Err(InlineEditError::ValidationError(_)) => {
                self.render_form(&object, form.as_context(), &request)
            }
            Err(e) => HttpResponse::from_error(&e),
        }
    }
}

/// Builds [`UpdateView`]s around one model form factory.
#[derive(Clone)]
pub struct UpdateViewFactory {
    name: String,
    store: Arc<dyn ModelStore>,
    form_factory: Arc<dyn ModelFormFactory>,
}

impl UpdateViewFactory {
    /// Creates a factory editing records through `form_factory`.
    pub fn new<F>(form_factory: F, store: Arc<dyn ModelStore>) -> Self
    where
        F: ModelFormFactory + 'static,
    {
        Self::from_arc(Arc::new(form_factory), store)
    }

    /// Creates a factory from an already shared form factory.
    pub fn from_arc(form_factory: Arc<dyn ModelFormFactory>, store: Arc<dyn ModelStore>) -> Self {
        Self {
            name: format!("UpdateView({})", form_factory.model_meta()),
            store,
            form_factory,
        }
    }

    /// Returns the model the built views edit.
    pub fn model_meta(&self) -> &ModelMeta {
        self.form_factory.model_meta()
    }
}

impl ViewFactory for UpdateViewFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_option(&self, option: &str) -> bool {
        UPDATE_VIEW_OPTIONS.contains(&option)
    }

    fn build(&self, options: &ViewOptions) -> InlineEditResult<Box<dyn View>> {
        Ok(Box::new(UpdateView::from_options(
            self.form_factory.clone(),
            self.store.clone(),
            options,
        )?))
    }
}
