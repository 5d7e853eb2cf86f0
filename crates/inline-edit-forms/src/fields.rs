//! Form field definitions, coercion, and change detection.
//!
//! A [`FormFieldDef`] describes one input: its type, whether it is
//! required, its label, and its initial value. [`clean_field_value`] turns
//! the submitted string into a JSON value or a list of error messages, and
//! [`field_has_changed`] compares submitted data against the initial value.

use serde_json::Value;

/// The data type of a form field, controlling parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormFieldType {
    /// Free text.
    Char {
        /// Minimum length in characters.
        min_length: Option<usize>,
        /// Maximum length in characters.
        max_length: Option<usize>,
        /// Whether surrounding whitespace is removed before validation.
        strip: bool,
    },
    /// A whole number.
    Integer {
        /// Smallest accepted value.
        min_value: Option<i64>,
        /// Largest accepted value.
        max_value: Option<i64>,
    },
    /// A checkbox. An absent value means `false`.
    Boolean,
    /// An email address.
    Email,
}

impl FormFieldType {
    /// A `Char` type with no length limits that strips whitespace.
    pub const fn text() -> Self {
        Self::Char {
            min_length: None,
            max_length: None,
            strip: true,
        }
    }
}

/// Complete definition of a form field.
#[derive(Debug, Clone, PartialEq)]
pub struct FormFieldDef {
    /// The field name (without any form prefix).
    pub name: String,
    /// The field type, controlling parsing and coercion.
    pub field_type: FormFieldType,
    /// Whether this field is required.
    pub required: bool,
    /// Default/initial value.
    pub initial: Option<Value>,
    /// Help text displayed alongside the field.
    pub help_text: String,
    /// Human-readable label.
    pub label: String,
    /// Whether the field is disabled (rendered but not editable).
    pub disabled: bool,
}

impl FormFieldDef {
    /// Creates a required field labelled after its name.
    pub fn new(name: impl Into<String>, field_type: FormFieldType) -> Self {
        let name = name.into();
        let label = name.replace('_', " ");
        Self {
            name,
            field_type,
            required: true,
            initial: None,
            help_text: String::new(),
            label,
            disabled: false,
        }
    }

    /// Sets whether this field is required.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Sets the initial value.
    #[must_use]
    pub fn initial(mut self, value: Value) -> Self {
        self.initial = Some(value);
        self
    }

    /// Sets the help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Sets the label.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets whether the field is disabled.
    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// Coerces and validates a raw submitted value.
///
/// Returns the cleaned value, or every error message the value produced.
///
/// # Examples
///
/// ```
/// use inline_edit_forms::fields::{clean_field_value, FormFieldDef, FormFieldType};
///
/// let field = FormFieldDef::new("max_plays", FormFieldType::Integer { min_value: Some(1), max_value: None });
/// assert_eq!(clean_field_value(&field, Some("3")), Ok(serde_json::json!(3)));
/// assert!(clean_field_value(&field, Some("0")).is_err());
/// assert!(clean_field_value(&field, None).is_err());
/// ```
pub fn clean_field_value(field: &FormFieldDef, raw: Option<&str>) -> Result<Value, Vec<String>> {
    if field.field_type == FormFieldType::Boolean {
        let checked = raw.is_some_and(is_truthy);
        if field.required && !checked {
            return Err(vec!["This field is required.".to_string()]);
        }
        return Ok(Value::Bool(checked));
    }

    let raw_str = match &field.field_type {
        FormFieldType::Char { strip: true, .. } | FormFieldType::Email => raw.unwrap_or("").trim(),
        _ => raw.unwrap_or(""),
    };

    if raw_str.is_empty() {
        if field.required {
            return Err(vec!["This field is required.".to_string()]);
        }
        return Ok(field.initial.clone().unwrap_or(Value::Null));
    }

    let mut errors = Vec::new();
    let value = match &field.field_type {
        FormFieldType::Char {
            min_length,
            max_length,
            ..
        } => {
            let len = raw_str.chars().count();
            if let Some(min) = min_length.filter(|min| len < *min) {
                errors.push(format!(
                    "Ensure this value has at least {min} characters (it has {len})."
                ));
            }
            if let Some(max) = max_length.filter(|max| len > *max) {
                errors.push(format!(
                    "Ensure this value has at most {max} characters (it has {len})."
                ));
            }
            Value::String(raw_str.to_string())
        }
        FormFieldType::Integer {
            min_value,
            max_value,
        } => match raw_str.parse::<i64>() {
            Ok(n) => {
                if let Some(min) = min_value.filter(|min| n < *min) {
                    errors.push(format!("Ensure this value is greater than or equal to {min}."));
                }
                if let Some(max) = max_value.filter(|max| n > *max) {
                    errors.push(format!("Ensure this value is less than or equal to {max}."));
                }
                Value::from(n)
            }
            Err(_) => {
                errors.push("Enter a whole number.".to_string());
                Value::Null
            }
        },
        FormFieldType::Email => {
            let valid = raw_str
                .split_once('@')
                .is_some_and(|(user, domain)| {
                    !user.is_empty() && domain.contains('.') && !domain.starts_with('.')
                        && !domain.ends_with('.')
                });
            if !valid {
                errors.push("Enter a valid email address.".to_string());
            }
            Value::String(raw_str.to_string())
        }
        FormFieldType::Boolean => unreachable!("handled above"),
    };

    if errors.is_empty() {
        Ok(value)
    } else {
        Err(errors)
    }
}

/// Returns `true` if the submitted value differs from the initial one.
pub fn field_has_changed(field: &FormFieldDef, initial: Option<&Value>, raw: Option<&str>) -> bool {
    if field.disabled {
        return false;
    }
    if field.field_type == FormFieldType::Boolean {
        let initial = initial.is_some_and(|v| matches!(v, Value::Bool(true)));
        return initial != raw.is_some_and(is_truthy);
    }
    let initial = initial.map_or_else(String::new, value_to_raw);
    let submitted = match &field.field_type {
        FormFieldType::Char { strip: true, .. } | FormFieldType::Email => raw.unwrap_or("").trim(),
        _ => raw.unwrap_or(""),
    };
    initial != submitted
}

/// Renders a JSON value the way it would appear in a submitted form.
pub fn value_to_raw(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub(crate) fn is_truthy(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn char_field(max: Option<usize>) -> FormFieldDef {
        FormFieldDef::new(
            "name",
            FormFieldType::Char {
                min_length: Some(2),
                max_length: max,
                strip: true,
            },
        )
    }

    #[test]
    fn test_char_valid_and_stripped() {
        assert_eq!(clean_field_value(&char_field(None), Some("  Bob ")), Ok(json!("Bob")));
    }

    #[test]
    fn test_char_length_errors() {
        let err = clean_field_value(&char_field(Some(3)), Some("a")).unwrap_err();
        assert_eq!(err.len(), 1);
        assert!(err[0].contains("at least 2"));
        let err = clean_field_value(&char_field(Some(3)), Some("abcd")).unwrap_err();
        assert!(err[0].contains("at most 3"));
    }

    #[test]
    fn test_required_missing() {
        let err = clean_field_value(&char_field(None), None).unwrap_err();
        assert_eq!(err, vec!["This field is required.".to_string()]);
    }

    #[test]
    fn test_optional_empty_uses_initial() {
        let field = FormFieldDef::new("note", FormFieldType::text())
            .required(false)
            .initial(json!("n/a"));
        assert_eq!(clean_field_value(&field, Some("")), Ok(json!("n/a")));
        let field = FormFieldDef::new("note", FormFieldType::text()).required(false);
        assert_eq!(clean_field_value(&field, None), Ok(Value::Null));
    }

    #[test]
    fn test_integer() {
        let field = FormFieldDef::new(
            "plays",
            FormFieldType::Integer {
                min_value: None,
                max_value: Some(10),
            },
        );
        assert_eq!(clean_field_value(&field, Some("7")), Ok(json!(7)));
        assert_eq!(
            clean_field_value(&field, Some("x")),
            Err(vec!["Enter a whole number.".to_string()])
        );
        assert!(clean_field_value(&field, Some("11")).unwrap_err()[0].contains("less than"));
    }

    #[test]
    fn test_boolean() {
        let field = FormFieldDef::new("active", FormFieldType::Boolean).required(false);
        assert_eq!(clean_field_value(&field, Some("on")), Ok(json!(true)));
        assert_eq!(clean_field_value(&field, None), Ok(json!(false)));
        let required = field.required(true);
        assert!(clean_field_value(&required, None).is_err());
    }

    #[test]
    fn test_email() {
        let field = FormFieldDef::new("contact", FormFieldType::Email);
        assert_eq!(clean_field_value(&field, Some("a@b.io")), Ok(json!("a@b.io")));
        assert!(clean_field_value(&field, Some("nope")).is_err());
        assert!(clean_field_value(&field, Some("a@b.")).is_err());
    }

    #[test]
    fn test_has_changed() {
        let field = FormFieldDef::new("name", FormFieldType::text());
        assert!(!field_has_changed(&field, Some(&json!("Bob")), Some(" Bob ")));
        assert!(field_has_changed(&field, Some(&json!("Bob")), Some("Rob")));
        assert!(!field_has_changed(&field, None, None));
        assert!(field_has_changed(&field, None, Some("x")));

        let plays = FormFieldDef::new(
            "plays",
            FormFieldType::Integer {
                min_value: None,
                max_value: None,
            },
        );
        assert!(!field_has_changed(&plays, Some(&json!(3)), Some("3")));
    }

    #[test]
    fn test_has_changed_boolean_and_disabled() {
        let field = FormFieldDef::new("active", FormFieldType::Boolean);
        assert!(!field_has_changed(&field, Some(&json!(false)), None));
        assert!(field_has_changed(&field, None, Some("on")));
        let disabled = FormFieldDef::new("name", FormFieldType::text()).disabled(true);
        assert!(!field_has_changed(&disabled, None, Some("x")));
    }
}
