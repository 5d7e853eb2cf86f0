//! Inline formsets coordinated by a parent model form.
//!
//! An [`InlineModelForm`] wraps a parent [`ModelForm`] and owns one
//! [`InlineFormSet`] per entry of its [`InlineDeclarations`]. The parent and
//! its children are bound to the same submitted data, validated together,
//! and saved parent-first so each child row can point at the parent's pk.
//!
//! Formset prefixes are derived from the parent prefix and the uppercased
//! relation key, joined by the configured separator:
//!
//! ```
//! use inline_edit_forms::formset_prefix;
//!
//! assert_eq!(formset_prefix(Some("prog"), "images"), "prog_IMAGES");
//! assert_eq!(formset_prefix(None, "images"), "IMAGES");
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use inline_edit_core::{InlineEditError, InlineEditResult, ModelInstance, ModelMeta, SETTINGS};
use inline_edit_http::QueryDict;

use crate::fields::FormFieldDef;
use crate::form::{Form, NON_FIELD_ERRORS};
use crate::formset::{FormConstructor, FormSet};
use crate::model_form::{
    construct_instance, invalid_form_error, BaseModelForm, ModelForm, ModelFormFactory,
};
use crate::store::ModelStore;

/// Returns the prefix of the formset declared under `key`.
pub fn formset_prefix(parent_prefix: Option<&str>, key: &str) -> String {
    let key = key.to_uppercase();
    match parent_prefix.filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{prefix}{}{key}", SETTINGS.get().formset_prefix_separator),
        None => key,
    }
}

/// A collection of child forms editing the rows related to one parent.
#[async_trait]
pub trait InlineFormSet: Send + Sync {
    /// Returns the formset prefix.
    fn prefix(&self) -> &str;

    /// Binds submitted data to every child form.
    fn bind(&mut self, data: &QueryDict);

    /// Returns `true` if the formset has been bound to data.
    fn is_bound(&self) -> bool;

    /// Returns the child forms in order.
    fn forms(&self) -> &[Box<dyn Form>];

    /// Returns the number of child forms.
    fn total_form_count(&self) -> usize {
        self.forms().len()
    }

    /// Returns errors that belong to the formset as a whole.
    fn non_form_errors(&self) -> &[String];

    /// Returns `true` if any child form changed.
    fn has_changed(&self) -> bool;

    /// Validates every child form and the formset-level constraints.
    async fn is_valid(&mut self) -> bool;

    /// Generates a template context for the formset.
    fn as_context(&self) -> Value;

    /// Persists the submitted rows against `parent` and returns the saved ones.
    async fn save(
        &mut self,
        parent: &ModelInstance,
        store: &dyn ModelStore,
    ) -> InlineEditResult<Vec<ModelInstance>>;
}

/// Builds an [`InlineFormSet`] for a parent instance.
#[async_trait]
pub trait InlineFormSetFactory: Send + Sync {
    /// Returns the metadata of the child model.
    fn child_meta(&self) -> &ModelMeta;

    /// Creates a formset under `prefix` for the children of `instance`.
    ///
    /// The formset is bound when `data` is given.
    async fn create(
        &self,
        data: Option<&QueryDict>,
        prefix: &str,
        instance: &ModelInstance,
        store: &dyn ModelStore,
    ) -> InlineEditResult<Box<dyn InlineFormSet>>;
}

/// A formset editing the child rows whose foreign key points at one parent.
pub struct ModelInlineFormSet {
    formset: FormSet,
    child_meta: ModelMeta,
    fk_name: String,
    fields: Vec<FormFieldDef>,
    existing: Arc<Vec<ModelInstance>>,
}

impl ModelInlineFormSet {
    /// Returns the child rows that existed when the formset was built.
    pub fn existing(&self) -> &[ModelInstance] {
        &self.existing
    }

    /// Returns the underlying formset.
    pub const fn formset(&self) -> &FormSet {
        &self.formset
    }

    /// Returns the name of the foreign-key field on the child model.
    pub fn fk_name(&self) -> &str {
        &self.fk_name
    }
}

#[async_trait]
impl InlineFormSet for ModelInlineFormSet {
    fn prefix(&self) -> &str {
        self.formset.prefix()
    }

    fn bind(&mut self, data: &QueryDict) {
        self.formset.bind(data);
    }

    fn is_bound(&self) -> bool {
        self.formset.is_bound()
    }

    fn forms(&self) -> &[Box<dyn Form>] {
        &self.formset.forms
    }

    fn non_form_errors(&self) -> &[String] {
        self.formset.non_form_errors()
    }

    fn has_changed(&self) -> bool {
        self.formset.has_changed()
    }

    async fn is_valid(&mut self) -> bool {
        self.formset.is_valid().await
    }

    fn as_context(&self) -> Value {
        let mut ctx = self.formset.as_context();
        if let Some(map) = ctx.as_object_mut() {
            map.insert("model".to_string(), json!(self.child_meta.label()));
            map.insert("fk_name".to_string(), json!(self.fk_name));
        }
        ctx
    }

    async fn save(
        &mut self,
        parent: &ModelInstance,
        store: &dyn ModelStore,
    ) -> InlineEditResult<Vec<ModelInstance>> {
        let Some(parent_pk) = parent.pk else {
            return Err(InlineEditError::IntegrityError(format!(
                "save() prohibited to prevent data loss due to unsaved related object '{}'",
                self.fk_name
            )));
        };
        if !self.formset.is_bound() {
            return Ok(Vec::new());
        }
        if !self.formset.is_valid().await {
            let mut errors = BTreeMap::new();
            merge_formset_errors(&*self, &mut errors);
            return Err(invalid_form_error(&self.child_meta, &errors));
        }

        let mut saved = Vec::new();
        for (i, form) in self.formset.forms.iter().enumerate() {
            let existing = self.existing.get(i);
            if self.formset.is_deleted(i) {
                if let Some(pk) = existing.and_then(|row| row.pk) {
                    store.delete(&self.child_meta, pk).await?;
                }
                continue;
            }
            if !form.has_changed() {
                continue;
            }
            let mut instance = existing.cloned().unwrap_or_default();
            construct_instance(&self.fields, form.cleaned_data(), &mut instance);
            instance.set(self.fk_name.clone(), json!(parent_pk));
            saved.push(store.save(&self.child_meta, instance).await?);
        }

        tracing::debug!(
            prefix = %self.formset.prefix(),
            model = %self.child_meta,
            saved = saved.len(),
            "Saved inline formset"
        );
        Ok(saved)
    }
}

/// Builds [`ModelInlineFormSet`]s for one child model and foreign key.
#[derive(Debug, Clone)]
pub struct ModelInlineFormSetFactory {
    child_meta: ModelMeta,
    fk_name: String,
    fields: Vec<FormFieldDef>,
    extra: usize,
    min_num: usize,
    max_num: usize,
    can_delete: bool,
}

impl ModelInlineFormSetFactory {
    /// Sets the number of blank forms added after the existing rows.
    #[must_use]
    pub fn extra(mut self, extra: usize) -> Self {
        self.extra = extra;
        self
    }

    /// Sets the minimum number of submitted forms.
    #[must_use]
    pub fn min_num(mut self, min_num: usize) -> Self {
        self.min_num = min_num;
        self
    }

    /// Sets the maximum number of forms.
    #[must_use]
    pub fn max_num(mut self, max_num: usize) -> Self {
        self.max_num = max_num;
        self
    }

    /// Sets whether rows can be deleted through a `DELETE` checkbox.
    #[must_use]
    pub fn can_delete(mut self, can_delete: bool) -> Self {
        self.can_delete = can_delete;
        self
    }

    /// Returns the name of the foreign-key field on the child model.
    pub fn fk_name(&self) -> &str {
        &self.fk_name
    }
}

/// Creates a factory for formsets editing `child_meta` rows whose `fk_name`
/// field holds the parent's pk.
///
/// `extra` and `max_num` default to the configured settings; deletion is enabled.
pub fn inline_formset_factory(
    child_meta: ModelMeta,
    fk_name: impl Into<String>,
    fields: Vec<FormFieldDef>,
) -> ModelInlineFormSetFactory {
    let settings = SETTINGS.get();
    ModelInlineFormSetFactory {
        child_meta,
        fk_name: fk_name.into(),
        fields,
        extra: settings.formset_default_extra,
        min_num: 0,
        max_num: settings.formset_default_max_num,
        can_delete: true,
    }
}

#[async_trait]
impl InlineFormSetFactory for ModelInlineFormSetFactory {
    fn child_meta(&self) -> &ModelMeta {
        &self.child_meta
    }

    async fn create(
        &self,
        data: Option<&QueryDict>,
        prefix: &str,
        instance: &ModelInstance,
        store: &dyn ModelStore,
    ) -> InlineEditResult<Box<dyn InlineFormSet>> {
        let existing = match instance.pk {
            Some(pk) => store.filter(&self.child_meta, &self.fk_name, &json!(pk)).await?,
            None => Vec::new(),
        };
        let existing = Arc::new(existing);

        let constructor: FormConstructor = {
            let meta = self.child_meta.clone();
            let fields = self.fields.clone();
            let existing = Arc::clone(&existing);
            Arc::new(move |i: usize| {
                Box::new(BaseModelForm::new(
                    meta.clone(),
                    fields.clone(),
                    existing.get(i).cloned(),
                )) as Box<dyn Form>
            })
        };

        let initial_count = existing.len();
        let total = (initial_count + self.extra).min(self.max_num.max(initial_count));
        let forms = (0..total).map(|i| constructor(i)).collect();
        let mut formset = FormSet::new(forms)
            .with_extra(self.extra)
            .with_min_num(self.min_num)
            .with_max_num(self.max_num)
            .with_can_delete(self.can_delete)
            .with_initial_count(initial_count)
            .with_constructor(constructor)
            .with_prefix(prefix);
        if let Some(data) = data {
            formset.bind(data);
        }

        Ok(Box::new(ModelInlineFormSet {
            formset,
            child_meta: self.child_meta.clone(),
            fk_name: self.fk_name.clone(),
            fields: self.fields.clone(),
            existing,
        }))
    }
}

/// Relation key to formset factory, in declaration order.
#[derive(Clone, Default)]
pub struct InlineDeclarations {
    entries: Vec<(String, Arc<dyn InlineFormSetFactory>)>,
}

impl InlineDeclarations {
    /// Creates an empty declaration list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an inline formset under `key`, replacing any previous one.
    #[must_use]
    pub fn inline(mut self, key: impl Into<String>, factory: impl InlineFormSetFactory + 'static) -> Self {
        let key = key.into();
        let factory: Arc<dyn InlineFormSetFactory> = Arc::new(factory);
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = factory,
            None => self.entries.push((key, factory)),
        }
        self
    }

    /// Returns the factory declared under `key`.
    pub fn get(&self, key: &str) -> Option<&Arc<dyn InlineFormSetFactory>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, f)| f)
    }

    /// Iterates over `(key, factory)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn InlineFormSetFactory>)> {
        self.entries.iter().map(|(k, f)| (k.as_str(), f))
    }

    /// Returns the number of declarations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is declared.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for InlineDeclarations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, factory)| (k, factory.child_meta().label())))
            .finish()
    }
}

/// A model form that validates and saves its inline formsets with it.
pub struct InlineModelForm {
    parent: Box<dyn ModelForm>,
    declarations: InlineDeclarations,
    formsets: Vec<(String, Box<dyn InlineFormSet>)>,
    data: Option<QueryDict>,
    errors: BTreeMap<String, Vec<String>>,
}

impl InlineModelForm {
    /// Wraps `parent` and builds one formset per declaration.
    ///
    /// When `data` is given the parent is bound to it and the formsets are
    /// bound to the same data, unless it is empty.
    pub async fn new(
        mut parent: Box<dyn ModelForm>,
        inlines: InlineDeclarations,
        data: Option<&QueryDict>,
        store: &dyn ModelStore,
    ) -> InlineEditResult<Self> {
        if let Some(data) = data {
            parent.bind(data);
        }
        let formsets =
            build_formsets(&inlines, parent.prefix(), data, parent.instance(), store).await?;
        Ok(Self {
            parent,
            declarations: inlines,
            formsets,
            data: data.cloned(),
            errors: BTreeMap::new(),
        })
    }

    /// Returns the wrapped parent form.
    pub fn parent(&self) -> &dyn ModelForm {
        self.parent.as_ref()
    }

    /// Returns the inline formsets keyed by relation key, in declaration order.
    pub fn inline_formsets(&self) -> impl Iterator<Item = (&str, &dyn InlineFormSet)> {
        self.formsets.iter().map(|(k, fs)| (k.as_str(), fs.as_ref()))
    }

    /// Returns the formset declared under `key`.
    pub fn inline_formset(&self, key: &str) -> Option<&dyn InlineFormSet> {
        self.formsets
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, fs)| fs.as_ref())
    }
}

async fn build_formsets(
    declarations: &InlineDeclarations,
    parent_prefix: Option<&str>,
    data: Option<&QueryDict>,
    instance: &ModelInstance,
    store: &dyn ModelStore,
) -> InlineEditResult<Vec<(String, Box<dyn InlineFormSet>)>> {
    let data = data.filter(|d| !d.is_empty());
    let mut formsets = Vec::with_capacity(declarations.len());
    for (key, factory) in declarations.iter() {
        let prefix = formset_prefix(parent_prefix, key);
        let formset = factory.create(data, &prefix, instance, store).await?;
        formsets.push((key.to_string(), formset));
    }
    Ok(formsets)
}

/// Folds a formset's errors into `errors`.
///
/// Child form `i` reports under `_{prefix}_{i}`, non-field errors first and
/// then `field: message`; formset-level errors go under `_{prefix}`.
fn merge_formset_errors(formset: &dyn InlineFormSet, errors: &mut BTreeMap<String, Vec<String>>) {
    let prefix = formset.prefix();
    for (i, form) in formset.forms().iter().enumerate() {
        let form_errors = form.errors();
        if form_errors.is_empty() {
            continue;
        }
        let mut messages = form.non_field_errors().to_vec();
        for (field, msgs) in form_errors.iter().filter(|(f, _)| *f != NON_FIELD_ERRORS) {
            messages.extend(msgs.iter().map(|msg| format!("{field}: {msg}")));
        }
        errors.insert(format!("_{prefix}_{i}"), messages);
    }
    if !formset.non_form_errors().is_empty() {
        errors.insert(format!("_{prefix}"), formset.non_form_errors().to_vec());
    }
}

#[async_trait]
impl Form for InlineModelForm {
    fn fields(&self) -> &[FormFieldDef] {
        self.parent.fields()
    }

    fn initial(&self) -> &BTreeMap<String, Value> {
        self.parent.initial()
    }

    fn prefix(&self) -> Option<&str> {
        self.parent.prefix()
    }

    /// Formset prefixes are fixed when the formsets are built.
    fn set_prefix(&mut self, prefix: Option<String>) {
        self.parent.set_prefix(prefix);
    }

    fn bind(&mut self, data: &QueryDict) {
        self.parent.bind(data);
        if !data.is_empty() {
            for (_, formset) in &mut self.formsets {
                formset.bind(data);
            }
        }
        self.data = Some(data.clone());
        self.errors.clear();
    }

    fn is_bound(&self) -> bool {
        self.parent.is_bound()
    }

    async fn is_valid(&mut self) -> bool {
        let parent_valid = self.parent.is_valid().await;
        self.errors = self.parent.errors().clone();

        let mut formsets_valid = true;
        for (_, formset) in &mut self.formsets {
            if formset.is_bound() && !formset.is_valid().await {
                formsets_valid = false;
            }
            merge_formset_errors(formset.as_ref(), &mut self.errors);
        }

        parent_valid && formsets_valid && self.errors.is_empty()
    }

    fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    fn cleaned_data(&self) -> &BTreeMap<String, Value> {
        self.parent.cleaned_data()
    }

    fn changed_data(&self) -> Vec<String> {
        self.parent.changed_data()
    }

    fn has_changed(&self) -> bool {
        self.parent.has_changed() || self.formsets.iter().any(|(_, fs)| fs.has_changed())
    }

    fn as_context(&self) -> Value {
        let mut ctx = self.parent.as_context();
        let inlines: Map<String, Value> = self
            .formsets
            .iter()
            .map(|(key, fs)| (key.clone(), fs.as_context()))
            .collect();
        if let Some(map) = ctx.as_object_mut() {
            map.insert("errors".to_string(), json!(self.errors));
            map.insert("inlines".to_string(), Value::Object(inlines));
        }
        ctx
    }
}

#[async_trait]
impl ModelForm for InlineModelForm {
    fn model_meta(&self) -> &ModelMeta {
        self.parent.model_meta()
    }

    fn instance(&self) -> &ModelInstance {
        self.parent.instance()
    }

    async fn save(&mut self, store: &dyn ModelStore) -> InlineEditResult<ModelInstance> {
        if !self.is_valid().await {
            return Err(invalid_form_error(self.parent.model_meta(), &self.errors));
        }

        let instance = self.parent.save(store).await?;
        self.formsets = build_formsets(
            &self.declarations,
            self.parent.prefix(),
            self.data.as_ref(),
            &instance,
            store,
        )
        .await?;

        for (key, formset) in &mut self.formsets {
            let saved = formset.save(&instance, store).await?;
            tracing::debug!(
                model = %self.parent.model_meta(),
                pk = ?instance.pk,
                inline = %key,
                rows = saved.len(),
                "Saved inline rows"
            );
        }
        Ok(instance)
    }
}

/// A [`ModelFormFactory`] wrapping another factory's forms in [`InlineModelForm`]s.
pub struct InlineModelFormFactory {
    parent: Arc<dyn ModelFormFactory>,
    inlines: InlineDeclarations,
}

impl InlineModelFormFactory {
    /// Wraps `parent` with the given inline declarations.
    pub fn new(parent: impl ModelFormFactory + 'static, inlines: InlineDeclarations) -> Self {
        Self {
            parent: Arc::new(parent),
            inlines,
        }
    }

    /// Returns the inline declarations.
    pub const fn inlines(&self) -> &InlineDeclarations {
        &self.inlines
    }
}

#[async_trait]
impl ModelFormFactory for InlineModelFormFactory {
    fn model_meta(&self) -> &ModelMeta {
        self.parent.model_meta()
    }

    async fn create(
        &self,
        data: Option<&QueryDict>,
        instance: Option<ModelInstance>,
        store: &dyn ModelStore,
    ) -> InlineEditResult<Box<dyn ModelForm>> {
        let parent = self.parent.create(data, instance, store).await?;
        let form = InlineModelForm::new(parent, self.inlines.clone(), data, store).await?;
        Ok(Box::new(form))
    }
}
