//! Formsets: collections of related forms on a single page.
//!
//! A [`FormSet`] manages multiple instances of the same form, handling the
//! management form data (`TOTAL_FORMS`, `INITIAL_FORMS`, ...) and
//! coordinating validation across all forms. Each form is namespaced as
//! `"{prefix}-{index}"`.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};

use inline_edit_http::QueryDict;

use crate::fields::is_truthy;
use crate::form::Form;

/// The default formset prefix.
const DEFAULT_PREFIX: &str = "form";

/// Management form field names.
pub const TOTAL_FORMS: &str = "TOTAL_FORMS";
pub const INITIAL_FORMS: &str = "INITIAL_FORMS";
pub const MIN_NUM_FORMS: &str = "MIN_NUM_FORMS";
pub const MAX_NUM_FORMS: &str = "MAX_NUM_FORMS";

/// Name of the per-form deletion checkbox.
pub const DELETION_FIELD_NAME: &str = "DELETE";

/// Builds the form at a given index.
pub type FormConstructor = Arc<dyn Fn(usize) -> Box<dyn Form> + Send + Sync>;

/// A collection of related forms managed together.
///
/// The first `initial_count` forms edit existing data; the rest are extra
/// forms that are only validated once the user fills them in.
pub struct FormSet {
    /// The individual form instances.
    pub forms: Vec<Box<dyn Form>>,
    /// Number of extra (empty) forms to display.
    pub extra: usize,
    /// Minimum number of forms required.
    pub min_num: usize,
    /// Maximum number of forms allowed.
    pub max_num: usize,
    /// Whether forms can be marked for deletion.
    pub can_delete: bool,
    initial_count: usize,
    prefix: String,
    constructor: Option<FormConstructor>,
    deleted: Vec<bool>,
    non_form_errors: Vec<String>,
    management_missing: bool,
    is_bound: bool,
}

impl FormSet {
    /// Creates a new `FormSet` over the given forms, all treated as extra.
    pub fn new(forms: Vec<Box<dyn Form>>) -> Self {
        let mut formset = Self {
            forms,
            extra: 1,
            min_num: 0,
            max_num: 1000,
            can_delete: false,
            initial_count: 0,
            prefix: DEFAULT_PREFIX.to_string(),
            constructor: None,
            deleted: Vec::new(),
            non_form_errors: Vec::new(),
            management_missing: false,
            is_bound: false,
        };
        formset.assign_prefixes();
        formset
    }

    /// Sets the number of extra forms.
    #[must_use]
    pub fn with_extra(mut self, extra: usize) -> Self {
        self.extra = extra;
        self
    }

    /// Sets the minimum number of forms.
    #[must_use]
    pub fn with_min_num(mut self, min_num: usize) -> Self {
        self.min_num = min_num;
        self
    }

    /// Sets the maximum number of forms.
    #[must_use]
    pub fn with_max_num(mut self, max_num: usize) -> Self {
        self.max_num = max_num;
        self
    }

    /// Enables form deletion support.
    #[must_use]
    pub fn with_can_delete(mut self, can_delete: bool) -> Self {
        self.can_delete = can_delete;
        self
    }

    /// Sets how many leading forms edit existing data.
    #[must_use]
    pub fn with_initial_count(mut self, initial_count: usize) -> Self {
        self.initial_count = initial_count.min(self.forms.len());
        self
    }

    /// Sets the formset prefix and renames every form accordingly.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self.assign_prefixes();
        self
    }

    /// Installs a constructor used to grow the formset to the submitted `TOTAL_FORMS`.
    #[must_use]
    pub fn with_constructor(mut self, constructor: FormConstructor) -> Self {
        self.constructor = Some(constructor);
        self
    }

    /// Returns the formset prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the total number of forms (initial + extra).
    pub fn total_form_count(&self) -> usize {
        self.forms.len()
    }

    /// Returns the number of forms that edit existing data.
    pub const fn initial_form_count(&self) -> usize {
        self.initial_count
    }

    /// Returns `true` if the form at `index` was marked for deletion.
    pub fn is_deleted(&self, index: usize) -> bool {
        self.deleted.get(index).copied().unwrap_or(false)
    }

    /// Returns the management form data keyed by full HTML name.
    pub fn management_form_data(&self) -> BTreeMap<String, String> {
        let prefix = &self.prefix;
        let mut data = BTreeMap::new();
        data.insert(format!("{prefix}-{TOTAL_FORMS}"), self.total_form_count().to_string());
        data.insert(format!("{prefix}-{INITIAL_FORMS}"), self.initial_count.to_string());
        data.insert(format!("{prefix}-{MIN_NUM_FORMS}"), self.min_num.to_string());
        data.insert(format!("{prefix}-{MAX_NUM_FORMS}"), self.max_num.to_string());
        data
    }

    /// Renders the management form as hidden HTML inputs.
    pub fn management_form_html(&self) -> String {
        self.management_form_data()
            .iter()
            .map(|(key, value)| format!(r#"<input type="hidden" name="{key}" value="{value}" />"#))
            .collect()
    }

    /// Binds form data to all forms in the formset.
    ///
    /// The submitted `TOTAL_FORMS` decides how many forms take part, capped
    /// at `max_num`. Missing management data is reported as a formset error.
    pub fn bind(&mut self, data: &QueryDict) {
        self.is_bound = true;
        self.non_form_errors.clear();

        let total_key = format!("{}-{TOTAL_FORMS}", self.prefix);
        match data.get(&total_key).and_then(|raw| raw.trim().parse::<usize>().ok()) {
            Some(total) => {
                self.management_missing = false;
                self.resize(total.min(self.max_num.max(self.initial_count)));
            }
            None => self.management_missing = true,
        }

        self.deleted = (0..self.forms.len())
            .map(|i| {
                self.can_delete
                    && data
                        .get(&format!("{}-{i}-{DELETION_FIELD_NAME}", self.prefix))
                        .is_some_and(is_truthy)
            })
            .collect();

        for form in &mut self.forms {
            form.bind(data);
        }
    }

    /// Validates all forms in the formset.
    ///
    /// Deleted forms and untouched extra forms are skipped. Returns `true`
    /// if every remaining form is valid and the formset-level checks pass.
    pub async fn is_valid(&mut self) -> bool {
        if !self.is_bound {
            return false;
        }

        self.non_form_errors.clear();
        if self.management_missing {
            self.non_form_errors.push(
                "ManagementForm data is missing or has been tampered with.".to_string(),
            );
        }

        let mut all_valid = true;
        let mut submitted = 0;
        for (i, form) in self.forms.iter_mut().enumerate() {
            let deleted = self.deleted.get(i).copied().unwrap_or(false);
            if deleted || (i >= self.initial_count && !form.has_changed()) {
                continue;
            }
            submitted += 1;
            if !form.is_valid().await {
                all_valid = false;
            }
        }

        if submitted < self.min_num {
            self.non_form_errors
                .push(format!("Please submit at least {} forms.", self.min_num));
        }
        if submitted > self.max_num {
            self.non_form_errors
                .push(format!("Please submit at most {} forms.", self.max_num));
        }

        all_valid && self.non_form_errors.is_empty()
    }

    /// Returns formset-level (non-form) errors.
    pub fn non_form_errors(&self) -> &[String] {
        &self.non_form_errors
    }

    /// Returns each form's error map, in form order.
    pub fn errors(&self) -> Vec<&BTreeMap<String, Vec<String>>> {
        self.forms.iter().map(|form| form.errors()).collect()
    }

    /// Returns `true` if the formset has been bound to data.
    pub const fn is_bound(&self) -> bool {
        self.is_bound
    }

    /// Returns `true` if any form changed or was marked for deletion.
    pub fn has_changed(&self) -> bool {
        self.deleted.iter().any(|d| *d) || self.forms.iter().any(|form| form.has_changed())
    }

    /// Generates a template context for the formset.
    pub fn as_context(&self) -> Value {
        let forms: Vec<Value> = self
            .forms
            .iter()
            .enumerate()
            .map(|(i, form)| {
                let mut ctx = form.as_context();
                if let Some(map) = ctx.as_object_mut() {
                    map.insert("deleted".to_string(), Value::Bool(self.is_deleted(i)));
                }
                ctx
            })
            .collect();

        json!({
            "prefix": self.prefix,
            "forms": forms,
            "management_form": self.management_form_html(),
            "non_form_errors": self.non_form_errors,
            "total_form_count": self.total_form_count(),
            "initial_form_count": self.initial_count,
            "can_delete": self.can_delete,
        })
    }

    fn resize(&mut self, total: usize) {
        if total < self.forms.len() {
            self.forms.truncate(total.max(self.initial_count));
        } else if let Some(constructor) = &self.constructor {
            while self.forms.len() < total {
                let form = constructor(self.forms.len());
                self.forms.push(form);
            }
        }
        self.assign_prefixes();
    }

    fn assign_prefixes(&mut self) {
        for (i, form) in self.forms.iter_mut().enumerate() {
            form.set_prefix(Some(format!("{}-{i}", self.prefix)));
        }
    }
}

/// Creates a formset with `initial_count + extra` forms built by `form_factory`.
///
/// The factory is kept so a submission may grow the formset up to `max_num`.
pub fn create_formset<F>(form_factory: F, initial_count: usize, extra: usize) -> FormSet
where
    F: Fn(usize) -> Box<dyn Form> + Send + Sync + 'static,
{
    let constructor: FormConstructor = Arc::new(form_factory);
    let forms: Vec<Box<dyn Form>> = (0..initial_count + extra).map(|i| constructor(i)).collect();
    FormSet::new(forms)
        .with_extra(extra)
        .with_initial_count(initial_count)
        .with_constructor(constructor)
}
