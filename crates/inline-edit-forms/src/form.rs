//! Form trait and `BaseForm` implementation.
//!
//! The [`Form`] trait is the core abstraction for every form type in the
//! workspace, including model forms and the inline coordinator. It supports
//! async validation (cross-field checks may hit a [`ModelStore`](crate::ModelStore)),
//! data binding from a [`QueryDict`], change detection, and template context
//! generation as JSON.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use inline_edit_http::QueryDict;

use crate::fields::{field_has_changed, value_to_raw, FormFieldDef};
use crate::validation;

/// Error-map key for errors that belong to the form as a whole.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Form-level validation hook used by [`BaseForm::with_cleaner`].
pub type FormCleaner =
    Arc<dyn Fn(&BTreeMap<String, Value>) -> Result<(), BTreeMap<String, Vec<String>>> + Send + Sync>;

/// The core form trait. All form types implement this.
///
/// Implementations must be `Send + Sync` so forms can live inside views
/// shared across tokio tasks.
#[async_trait]
pub trait Form: Send + Sync {
    /// Returns the form's field definitions.
    fn fields(&self) -> &[FormFieldDef];

    /// Returns the initial (default) values for fields.
    fn initial(&self) -> &BTreeMap<String, Value>;

    /// Returns the form prefix (for namespacing multiple forms on one page).
    fn prefix(&self) -> Option<&str>;

    /// Replaces the form prefix. Takes effect on the next [`bind`](Form::bind).
    fn set_prefix(&mut self, prefix: Option<String>);

    /// Returns the HTML name for a field, taking the prefix into account.
    fn add_prefix(&self, field_name: &str) -> String {
        match self.prefix() {
            Some(prefix) => format!("{prefix}-{field_name}"),
            None => field_name.to_string(),
        }
    }

    /// Binds raw form data to this form, clearing previous results.
    fn bind(&mut self, data: &QueryDict);

    /// Returns `true` if this form has been bound to data.
    fn is_bound(&self) -> bool;

    /// Validates the form. Returns `true` if valid.
    ///
    /// After calling this, `errors()` and `cleaned_data()` are populated.
    /// An unbound form is never valid.
    async fn is_valid(&mut self) -> bool;

    /// Returns validation errors keyed by field name.
    fn errors(&self) -> &BTreeMap<String, Vec<String>>;

    /// Returns the errors stored under [`NON_FIELD_ERRORS`].
    fn non_field_errors(&self) -> &[String] {
        self.errors()
            .get(NON_FIELD_ERRORS)
            .map_or(&[], Vec::as_slice)
    }

    /// Returns the cleaned (validated and coerced) data.
    fn cleaned_data(&self) -> &BTreeMap<String, Value>;

    /// Returns the names of fields whose submitted value differs from the initial one.
    fn changed_data(&self) -> Vec<String>;

    /// Returns `true` if any field changed.
    fn has_changed(&self) -> bool {
        !self.changed_data().is_empty()
    }

    /// Generates a template context for rendering.
    fn as_context(&self) -> Value;

    /// Cross-field validation hook. The default implementation does nothing.
    async fn clean(&self) -> Result<(), BTreeMap<String, Vec<String>>> {
        Ok(())
    }
}

/// A general-purpose form implementation.
///
/// `BaseForm` holds a list of field definitions and manages binding,
/// validation, and cleaned data. Model forms and formsets build on it.
pub struct BaseForm {
    field_defs: Vec<FormFieldDef>,
    initial_data: BTreeMap<String, Value>,
    prefix: Option<String>,
    bound: bool,
    raw_data: BTreeMap<String, Option<String>>,
    errors: BTreeMap<String, Vec<String>>,
    cleaned_data: BTreeMap<String, Value>,
    cleaner: Option<FormCleaner>,
}

impl BaseForm {
    /// Creates a new `BaseForm` with the given field definitions.
    pub fn new(fields: Vec<FormFieldDef>) -> Self {
        Self {
            field_defs: fields,
            initial_data: BTreeMap::new(),
            prefix: None,
            bound: false,
            raw_data: BTreeMap::new(),
            errors: BTreeMap::new(),
            cleaned_data: BTreeMap::new(),
            cleaner: None,
        }
    }

    /// Sets initial (default) values for fields.
    #[must_use]
    pub fn with_initial(mut self, initial: BTreeMap<String, Value>) -> Self {
        self.initial_data = initial;
        self
    }

    /// Sets the form prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Installs a form-level validation hook run after field validation.
    #[must_use]
    pub fn with_cleaner(mut self, cleaner: FormCleaner) -> Self {
        self.cleaner = Some(cleaner);
        self
    }

    /// Returns the raw submitted value for a field, if bound.
    pub fn raw_value(&self, field_name: &str) -> Option<&str> {
        self.raw_data.get(field_name).and_then(Option::as_deref)
    }

    /// Returns the initial value for a field: form-level initial first, then the field default.
    pub fn initial_value<'a>(&'a self, field: &'a FormFieldDef) -> Option<&'a Value> {
        self.initial_data.get(&field.name).or(field.initial.as_ref())
    }
}

#[async_trait]
impl Form for BaseForm {
    fn fields(&self) -> &[FormFieldDef] {
        &self.field_defs
    }

    fn initial(&self) -> &BTreeMap<String, Value> {
        &self.initial_data
    }

    fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    fn set_prefix(&mut self, prefix: Option<String>) {
        self.prefix = prefix;
    }

    fn bind(&mut self, data: &QueryDict) {
        self.bound = true;
        self.raw_data.clear();
        self.errors.clear();
        self.cleaned_data.clear();

        for field in &self.field_defs {
            let html_name = self.add_prefix(&field.name);
            let value = data.get(&html_name).map(String::from);
            self.raw_data.insert(field.name.clone(), value);
        }
    }

    fn is_bound(&self) -> bool {
        self.bound
    }

    async fn is_valid(&mut self) -> bool {
        if !self.bound {
            return false;
        }

        self.errors.clear();
        self.cleaned_data.clear();

        validation::clean_fields(
            &self.field_defs,
            &self.raw_data,
            &self.initial_data,
            &mut self.cleaned_data,
            &mut self.errors,
        );

        if let Err(form_errors) = self.clean().await {
            for (key, msgs) in form_errors {
                self.errors.entry(key).or_default().extend(msgs);
            }
        }

        self.errors.is_empty()
    }

    fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    fn cleaned_data(&self) -> &BTreeMap<String, Value> {
        &self.cleaned_data
    }

    fn changed_data(&self) -> Vec<String> {
        if !self.bound {
            return Vec::new();
        }
        self.field_defs
            .iter()
            .filter(|field| {
                field_has_changed(field, self.initial_value(field), self.raw_value(&field.name))
            })
            .map(|field| field.name.clone())
            .collect()
    }

    fn as_context(&self) -> Value {
        let fields: Vec<Value> = self
            .field_defs
            .iter()
            .map(|field| {
                let value = if self.bound {
                    self.raw_value(&field.name).unwrap_or_default().to_string()
                } else {
                    self.initial_value(field).map(value_to_raw).unwrap_or_default()
                };
                json!({
                    "name": field.name,
                    "html_name": self.add_prefix(&field.name),
                    "label": field.label,
                    "help_text": field.help_text,
                    "required": field.required,
                    "disabled": field.disabled,
                    "value": value,
                    "errors": self.errors.get(&field.name).cloned().unwrap_or_default(),
                })
            })
            .collect();

        json!({
            "fields": fields,
            "errors": self.errors,
            "non_field_errors": self.non_field_errors(),
            "is_bound": self.bound,
            "prefix": self.prefix,
        })
    }

    async fn clean(&self) -> Result<(), BTreeMap<String, Vec<String>>> {
        match &self.cleaner {
            Some(cleaner) => cleaner(&self.cleaned_data),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FormFieldType;

    fn make_test_form() -> BaseForm {
        BaseForm::new(vec![
            FormFieldDef::new(
                "username",
                FormFieldType::Char {
                    min_length: Some(3),
                    max_length: Some(20),
                    strip: true,
                },
            ),
            FormFieldDef::new("email", FormFieldType::Email),
            FormFieldDef::new(
                "age",
                FormFieldType::Integer {
                    min_value: Some(0),
                    max_value: Some(150),
                },
            )
            .required(false),
        ])
    }

    #[tokio::test]
    async fn test_form_unbound() {
        let mut form = make_test_form();
        assert!(!form.is_bound());
        assert!(!form.is_valid().await);
        assert!(!form.has_changed());
    }

    #[tokio::test]
    async fn test_form_bind_and_validate() {
        let mut form = make_test_form();
        form.bind(&QueryDict::parse("username=alice&email=alice@example.com&age=30"));
        assert!(form.is_bound());
        assert!(form.is_valid().await);
        assert_eq!(form.cleaned_data().get("username"), Some(&json!("alice")));
        assert_eq!(form.cleaned_data().get("age"), Some(&json!(30)));
    }

    #[tokio::test]
    async fn test_form_validation_errors() {
        let mut form = make_test_form();
        form.bind(&QueryDict::parse("username=ab&email=not-email"));
        assert!(!form.is_valid().await);
        assert!(form.errors().contains_key("username"));
        assert!(form.errors().contains_key("email"));
    }

    #[tokio::test]
    async fn test_form_with_prefix() {
        let mut form = make_test_form().with_prefix("myform");
        assert_eq!(form.prefix(), Some("myform"));
        assert_eq!(form.add_prefix("email"), "myform-email");
        form.bind(&QueryDict::parse(
            "myform-username=alice&myform-email=alice@example.com&myform-age=25",
        ));
        assert!(form.is_valid().await);
    }

    #[tokio::test]
    async fn test_cleaner_adds_non_field_errors() {
        let cleaner: FormCleaner = Arc::new(|data| {
            if data.get("username") == Some(&json!("admin")) {
                let mut errors = BTreeMap::new();
                errors.insert(
                    NON_FIELD_ERRORS.to_string(),
                    vec!["Reserved name.".to_string()],
                );
                Err(errors)
            } else {
                Ok(())
            }
        });
        let mut form = make_test_form().with_cleaner(cleaner);
        form.bind(&QueryDict::parse("username=admin&email=a@b.io"));
        assert!(!form.is_valid().await);
        assert_eq!(form.non_field_errors(), ["Reserved name.".to_string()]);
    }

    #[test]
    fn test_changed_data() {
        let mut initial = BTreeMap::new();
        initial.insert("username".to_string(), json!("alice"));
        initial.insert("email".to_string(), json!("alice@example.com"));
        let mut form = make_test_form().with_initial(initial);

        form.bind(&QueryDict::parse("username=alice&email=alice@example.com"));
        assert!(!form.has_changed());

        form.bind(&QueryDict::parse("username=alicia&email=alice@example.com"));
        assert_eq!(form.changed_data(), vec!["username".to_string()]);
    }

    #[test]
    fn test_initial_value_falls_back_to_field_default() {
        let mut initial = BTreeMap::new();
        initial.insert("username".to_string(), json!("alice"));
        let form = make_test_form().with_initial(initial);

        let fields = form.fields();
        assert_eq!(form.initial_value(&fields[0]), Some(&json!("alice")));
        assert_eq!(form.initial_value(&fields[1]), None);

        let age = FormFieldDef::new(
            "age",
            FormFieldType::Integer {
                min_value: None,
                max_value: None,
            },
        )
        .initial(json!(30));
        assert_eq!(form.initial_value(&age), Some(&json!(30)));
    }

    #[tokio::test]
    async fn test_form_as_context() {
        let mut form = make_test_form();
        form.bind(&QueryDict::parse("username=alice&email=bad"));
        form.is_valid().await;

        let ctx = form.as_context();
        assert_eq!(ctx["fields"].as_array().map(Vec::len), Some(3));
        assert_eq!(ctx["fields"][0]["value"], json!("alice"));
        assert!(ctx["errors"]["email"].is_array());
        assert_eq!(ctx["is_bound"], json!(true));
    }

    #[tokio::test]
    async fn test_form_rebind_clears_state() {
        let mut form = make_test_form();
        form.bind(&QueryDict::parse("username=ab"));
        assert!(!form.is_valid().await);
        form.bind(&QueryDict::parse("username=alice&email=alice@example.com"));
        assert!(form.is_valid().await);
        assert!(form.errors().is_empty());
    }
}
