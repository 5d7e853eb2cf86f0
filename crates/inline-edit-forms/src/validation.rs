//! Validation pipeline for form processing.
//!
//! 1. Field-level validation (type coercion + per-field checks)
//! 2. Form-level cross-field validation (async, can hit the store)
//!
//! Errors accumulate rather than short-circuiting, so every problem is
//! reported at once.

use std::collections::BTreeMap;

use serde_json::Value;

use inline_edit_core::ValidationError;

use crate::fields::{clean_field_value, FormFieldDef};
use crate::form::Form;

/// Performs field-level validation for all fields.
///
/// Disabled fields take their initial value without validation.
pub fn clean_fields(
    field_defs: &[FormFieldDef],
    raw_data: &BTreeMap<String, Option<String>>,
    initial: &BTreeMap<String, Value>,
    cleaned_data: &mut BTreeMap<String, Value>,
    errors: &mut BTreeMap<String, Vec<String>>,
) {
    for field in field_defs {
        if field.disabled {
            let value = initial
                .get(&field.name)
                .or(field.initial.as_ref())
                .cloned()
                .unwrap_or(Value::Null);
            cleaned_data.insert(field.name.clone(), value);
            continue;
        }

        let raw = raw_data.get(&field.name).and_then(Option::as_deref);
        match clean_field_value(field, raw) {
            Ok(value) => {
                cleaned_data.insert(field.name.clone(), value);
            }
            Err(field_errors) => {
                errors.insert(field.name.clone(), field_errors);
            }
        }
    }
}

/// Runs the full pipeline and returns the errors as a [`ValidationError`].
pub async fn full_clean(form: &mut dyn Form) -> Result<(), ValidationError> {
    if form.is_valid().await {
        Ok(())
    } else {
        Err(ValidationError::with_field_errors(form.errors().clone()))
    }
}
