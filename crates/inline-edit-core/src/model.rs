//! Model metadata and persisted record instances.
//!
//! [`ModelMeta`] is the resource descriptor views expose and permission
//! checks key on. [`ModelInstance`] is the untyped record the form layer
//! reads initial values from and the persistence collaborator writes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a model: the app it belongs to and its lowercase name.
///
/// # Examples
///
/// ```
/// use inline_edit_core::model::ModelMeta;
///
/// let meta = ModelMeta::new("radio", "program");
/// assert_eq!(meta.label(), "radio.program");
/// assert_eq!(meta.permission_codename("change"), "change_program");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelMeta {
    /// The application label (e.g. "radio").
    pub app_label: String,
    /// The lowercase model name (e.g. "program").
    pub model_name: String,
    /// Human-readable name; defaults to the model name.
    #[serde(default)]
    pub verbose_name: String,
}

impl ModelMeta {
    /// Creates model metadata with the verbose name defaulting to the model name.
    pub fn new(app_label: impl Into<String>, model_name: impl Into<String>) -> Self {
        let model_name = model_name.into();
        Self {
            app_label: app_label.into(),
            verbose_name: model_name.clone(),
            model_name,
        }
    }

    /// Overrides the verbose name.
    #[must_use]
    pub fn with_verbose_name(mut self, verbose_name: impl Into<String>) -> Self {
        self.verbose_name = verbose_name.into();
        self
    }

    /// Returns `"app_label.model_name"`.
    pub fn label(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Returns the permission codename for an action, e.g. `"change_program"`.
    pub fn permission_codename(&self, action: &str) -> String {
        format!("{action}_{}", self.model_name)
    }
}

impl fmt::Display for ModelMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model_name)
    }
}

/// A single record: an optional primary key plus named field values.
///
/// An instance without a primary key has not been persisted yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInstance {
    /// The primary key, assigned by the store on first save.
    pub pk: Option<i64>,
    /// Field values keyed by field name.
    pub values: BTreeMap<String, serde_json::Value>,
}

impl ModelInstance {
    /// Creates an empty, unsaved instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the primary key.
    #[must_use]
    pub const fn with_pk(mut self, pk: i64) -> Self {
        self.pk = Some(pk);
        self
    }

    /// Sets a field value.
    #[must_use]
    pub fn with_value(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.values.insert(field.into(), value);
        self
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&serde_json::Value> {
        self.values.get(field)
    }

    /// Sets a field value in place.
    pub fn set(&mut self, field: impl Into<String>, value: serde_json::Value) {
        self.values.insert(field.into(), value);
    }

    /// Returns `true` once the store has assigned a primary key.
    pub const fn is_saved(&self) -> bool {
        self.pk.is_some()
    }

    /// Renders the instance as a JSON object with a `pk` entry.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map: serde_json::Map<String, serde_json::Value> = self
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        map.insert("pk".to_string(), self.pk.map_or(serde_json::Value::Null, Into::into));
        serde_json::Value::Object(map)
    }
}
