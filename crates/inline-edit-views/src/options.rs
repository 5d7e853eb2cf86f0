//! Named view options.
//!
//! A [`ViewOptions`] map carries configuration into a
//! [`ViewFactory`](crate::views::factory::ViewFactory) at registration time:
//! a template suffix, a success URL, extra context. Options shared between
//! the two branches of a conditional dispatch must be comparable so that
//! declared and call-site values can be merged; only
//! [`OptionValue::Json`] values are.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use inline_edit_core::{InlineEditError, InlineEditResult};

/// A single option value.
#[derive(Clone)]
pub enum OptionValue {
    /// A plain data value. Comparable.
    Json(Value),
    /// An opaque shared handle (a store, a callback). Not comparable.
    Handle(Arc<dyn Any + Send + Sync>),
}

impl OptionValue {
    /// Wraps an arbitrary value in a [`OptionValue::Handle`].
    pub fn handle<T: Any + Send + Sync>(value: T) -> Self {
        Self::Handle(Arc::new(value))
    }

    /// Returns the JSON value, if this is one.
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Handle(_) => None,
        }
    }

    /// Returns the string payload of a JSON string value.
    pub fn as_str(&self) -> Option<&str> {
        self.as_json().and_then(Value::as_str)
    }

    /// Downcasts a handle to a concrete type.
    pub fn downcast<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Handle(handle) => handle.downcast_ref::<T>(),
            Self::Json(_) => None,
        }
    }

    /// Returns `true` if this value can take part in equality checks.
    pub const fn is_comparable(&self) -> bool {
        matches!(self, Self::Json(_))
    }

    /// Compares two values. `None` when either side is not comparable.
    pub fn try_eq(&self, other: &Self) -> Option<bool> {
        match (self, other) {
            (Self::Json(a), Self::Json(b)) => Some(a == b),
            _ => None,
        }
    }
}

impl fmt::Debug for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Self::Handle(_) => f.write_str("Handle(..)"),
        }
    }
}

impl From<Value> for OptionValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Json(Value::String(value.to_string()))
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Json(Value::String(value))
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Json(Value::from(value))
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Json(Value::Bool(value))
    }
}

/// An insertion-ordered map of option name to [`OptionValue`].
///
/// # Examples
///
/// ```
/// use inline_edit_views::ViewOptions;
///
/// let options = ViewOptions::new()
///     .with("template_name_suffix", "_inline_form")
///     .with("paginate_by", 20_i64);
///
/// assert_eq!(options.get_str("template_name_suffix"), Some("_inline_form"));
/// assert_eq!(options.names().collect::<Vec<_>>(), ["template_name_suffix", "paginate_by"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ViewOptions {
    entries: Vec<(String, OptionValue)>,
}

impl ViewOptions {
    /// Creates an empty map.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets an option. An existing entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Returns an option by name.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns an option's JSON value.
    pub fn get_json(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(OptionValue::as_json)
    }

    /// Returns an option's string value.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(OptionValue::as_str)
    }

    /// Returns `true` if the option is set.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates the option names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Iterates `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Returns the number of options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no option is set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fails with [`InlineEditError::TypeConfiguration`] on the first
    /// non-comparable value. `owner` names the view in the message.
    pub fn ensure_comparable(&self, owner: &str) -> InlineEditResult<()> {
        match self.iter().find(|(_, value)| !value.is_comparable()) {
            Some((name, _)) => Err(InlineEditError::TypeConfiguration(format!(
                "Shared option '{name}' of {owner} must be comparable; \
                 pass data values, not handles"
            ))),
            None => Ok(()),
        }
    }

    /// Merges `overrides` on top of `base`.
    ///
    /// Both maps must be comparable. A later value replaces an earlier one
    /// under the same name; an identical value is kept once.
    pub fn merged(base: &Self, overrides: &Self, owner: &str) -> InlineEditResult<Self> {
        base.ensure_comparable(owner)?;
        overrides.ensure_comparable(owner)?;

        let mut merged = base.clone();
        for (name, value) in overrides.iter() {
            match merged.get(name).and_then(|existing| existing.try_eq(value)) {
                Some(true) => {
                    tracing::trace!(option = name, view = owner, "duplicate option value dropped");
                }
                _ => merged.insert(name, value.clone()),
            }
        }
        Ok(merged)
    }

    /// Returns the options whose names satisfy `accepts`, in order.
    #[must_use]
    pub fn filtered<F>(&self, accepts: F) -> Self
    where
        F: Fn(&str) -> bool,
    {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(name, _)| accepts(name.as_str()))
                .cloned()
                .collect(),
        }
    }
}

impl<K, V> FromIterator<(K, V)> for ViewOptions
where
    K: Into<String>,
    V: Into<OptionValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Self::new();
        for (name, value) in iter {
            options.insert(name, value);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── OptionValue tests ───────────────────────────────────────────

    #[test]
    fn test_json_values_compare() {
        let a = OptionValue::from(1_i64);
        let b = OptionValue::from(json!(1));
        assert_eq!(a.try_eq(&b), Some(true));
        assert_eq!(a.try_eq(&OptionValue::from("1")), Some(false));
    }

    #[test]
    fn test_handles_do_not_compare() {
        let handle = OptionValue::handle(42_u8);
        assert!(!handle.is_comparable());
        assert_eq!(handle.try_eq(&handle.clone()), None);
        assert_eq!(handle.downcast::<u8>(), Some(&42));
        assert_eq!(format!("{handle:?}"), "Handle(..)");
    }

    // ── ViewOptions tests ───────────────────────────────────────────

    #[test]
    fn test_insert_replaces_in_place() {
        let mut options = ViewOptions::new().with("a", 1_i64).with("b", 2_i64);
        options.insert("a", 10_i64);
        assert_eq!(options.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(options.get_json("a"), Some(&json!(10)));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_merged_later_wins() {
        let base = ViewOptions::new().with("a", 1_i64).with("b", 2_i64);
        let overrides = ViewOptions::new().with("b", 3_i64).with("c", 4_i64);
        let merged = ViewOptions::merged(&base, &overrides, "EditView").unwrap();
        assert_eq!(merged.names().collect::<Vec<_>>(), ["a", "b", "c"]);
        assert_eq!(merged.get_json("b"), Some(&json!(3)));
    }

    #[test]
    fn test_merged_rejects_handles() {
        let base = ViewOptions::new().with("store", OptionValue::handle("x"));
        let err = ViewOptions::merged(&base, &ViewOptions::new(), "EditView").unwrap_err();
        assert!(matches!(err, InlineEditError::TypeConfiguration(_)));
        assert!(err.to_string().contains("'store'"));

        let overrides = ViewOptions::new().with("store", OptionValue::handle("y"));
        let err = ViewOptions::merged(&ViewOptions::new(), &overrides, "EditView").unwrap_err();
        assert!(matches!(err, InlineEditError::TypeConfiguration(_)));
    }

    #[test]
    fn test_filtered_keeps_order() {
        let options: ViewOptions = [("a", 1_i64), ("b", 2), ("c", 3)].into_iter().collect();
        let kept = options.filtered(|name| name != "b");
        assert_eq!(kept.names().collect::<Vec<_>>(), ["a", "c"]);
        assert!(!kept.contains("b"));
        assert!(options.filtered(|_| false).is_empty());
    }
}
