//! Model-backed forms.
//!
//! A [`ModelForm`] edits one [`ModelInstance`] of a model described by
//! [`ModelMeta`]: its initial values come from the instance and `save`
//! writes the cleaned data back through a [`ModelStore`].
//! [`ModelFormFactory`] builds such forms per request, which is how views
//! and the inline coordinator obtain them.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use inline_edit_core::{
    InlineEditError, InlineEditResult, ModelInstance, ModelMeta, ValidationError,
};
use inline_edit_http::QueryDict;

use crate::fields::FormFieldDef;
use crate::form::{BaseForm, Form};
use crate::store::ModelStore;

/// A form bound to a model instance.
#[async_trait]
pub trait ModelForm: Form {
    /// Returns the metadata of the edited model.
    fn model_meta(&self) -> &ModelMeta;

    /// Returns the edited instance (unsaved when the form creates a record).
    fn instance(&self) -> &ModelInstance;

    /// Validates the form, then writes the cleaned data through `store`.
    ///
    /// Returns the saved instance. Fails with a validation error when the
    /// form is unbound or invalid.
    async fn save(&mut self, store: &dyn ModelStore) -> InlineEditResult<ModelInstance>;
}

/// Builds model forms for a request.
#[async_trait]
pub trait ModelFormFactory: Send + Sync {
    /// Returns the metadata of the model the produced forms edit.
    fn model_meta(&self) -> &ModelMeta;

    /// Creates a form for `instance` (or a new record), bound when `data` is given.
    async fn create(
        &self,
        data: Option<&QueryDict>,
        instance: Option<ModelInstance>,
        store: &dyn ModelStore,
    ) -> InlineEditResult<Box<dyn ModelForm>>;
}

/// Copies cleaned values of editable fields onto `instance`.
pub fn construct_instance(
    fields: &[FormFieldDef],
    cleaned_data: &BTreeMap<String, Value>,
    instance: &mut ModelInstance,
) {
    for field in fields.iter().filter(|field| !field.disabled) {
        if let Some(value) = cleaned_data.get(&field.name) {
            instance.set(field.name.clone(), value.clone());
        }
    }
}

/// Builds the error returned by `save` on an invalid form.
pub(crate) fn invalid_form_error(meta: &ModelMeta, errors: &BTreeMap<String, Vec<String>>) -> InlineEditError {
    if errors.is_empty() {
        InlineEditError::ValidationError(ValidationError::new(
            format!(
                "The {} could not be saved because the data didn't validate.",
                meta.model_name
            ),
            "invalid",
        ))
    } else {
        InlineEditError::ValidationError(ValidationError::with_field_errors(errors.clone()))
    }
}

/// A general-purpose [`ModelForm`] over a [`BaseForm`].
pub struct BaseModelForm {
    form: BaseForm,
    meta: ModelMeta,
    instance: ModelInstance,
}

impl BaseModelForm {
    /// Creates a form for `instance`, or for a new record when `None`.
    ///
    /// Field initial values are taken from the instance.
    pub fn new(meta: ModelMeta, fields: Vec<FormFieldDef>, instance: Option<ModelInstance>) -> Self {
        let instance = instance.unwrap_or_default();
        let initial = fields
            .iter()
            .filter_map(|field| {
                instance
                    .get(&field.name)
                    .map(|value| (field.name.clone(), value.clone()))
            })
            .collect();
        Self {
            form: BaseForm::new(fields).with_initial(initial),
            meta,
            instance,
        }
    }

    /// Sets the form prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.form.set_prefix(Some(prefix.into()));
        self
    }
}

#[async_trait]
impl Form for BaseModelForm {
    fn fields(&self) -> &[FormFieldDef] {
        self.form.fields()
    }

    fn initial(&self) -> &BTreeMap<String, Value> {
        self.form.initial()
    }

    fn prefix(&self) -> Option<&str> {
        self.form.prefix()
    }

    fn set_prefix(&mut self, prefix: Option<String>) {
        self.form.set_prefix(prefix);
    }

    fn bind(&mut self, data: &QueryDict) {
        self.form.bind(data);
    }

    fn is_bound(&self) -> bool {
        self.form.is_bound()
    }

    async fn is_valid(&mut self) -> bool {
        self.form.is_valid().await
    }

    fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        self.form.errors()
    }

    fn cleaned_data(&self) -> &BTreeMap<String, Value> {
        self.form.cleaned_data()
    }

    fn changed_data(&self) -> Vec<String> {
        self.form.changed_data()
    }

    fn as_context(&self) -> Value {
        let mut ctx = self.form.as_context();
        if let Some(map) = ctx.as_object_mut() {
            map.insert("instance".to_string(), self.instance.to_json());
        }
        ctx
    }
}

#[async_trait]
impl ModelForm for BaseModelForm {
    fn model_meta(&self) -> &ModelMeta {
        &self.meta
    }

    fn instance(&self) -> &ModelInstance {
        &self.instance
    }

    async fn save(&mut self, store: &dyn ModelStore) -> InlineEditResult<ModelInstance> {
        if !self.form.is_valid().await {
            return Err(invalid_form_error(&self.meta, self.form.errors()));
        }
        let mut instance = self.instance.clone();
        construct_instance(self.form.fields(), self.form.cleaned_data(), &mut instance);
        self.instance = store.save(&self.meta, instance).await?;
        Ok(self.instance.clone())
    }
}

/// A [`ModelFormFactory`] producing [`BaseModelForm`]s over a fixed field list.
#[derive(Debug, Clone)]
pub struct BaseModelFormFactory {
    meta: ModelMeta,
    fields: Vec<FormFieldDef>,
    prefix: Option<String>,
}

impl BaseModelFormFactory {
    /// Creates a factory for `meta` with the given fields.
    pub fn new(meta: ModelMeta, fields: Vec<FormFieldDef>) -> Self {
        Self {
            meta,
            fields,
            prefix: None,
        }
    }

    /// Sets the prefix of produced forms.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Builds a form synchronously; used by `create`.
    pub fn build(&self, data: Option<&QueryDict>, instance: Option<ModelInstance>) -> BaseModelForm {
        let mut form = BaseModelForm::new(self.meta.clone(), self.fields.clone(), instance);
        if let Some(prefix) = &self.prefix {
            form.set_prefix(Some(prefix.clone()));
        }
        if let Some(data) = data {
            form.bind(data);
        }
        form
    }
}

#[async_trait]
impl ModelFormFactory for BaseModelFormFactory {
    fn model_meta(&self) -> &ModelMeta {
        &self.meta
    }

    async fn create(
        &self,
        data: Option<&QueryDict>,
        instance: Option<ModelInstance>,
        _store: &dyn ModelStore,
    ) -> InlineEditResult<Box<dyn ModelForm>> {
        Ok(Box::new(self.build(data, instance)))
    }
}
