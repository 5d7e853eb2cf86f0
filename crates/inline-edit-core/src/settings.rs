//! Settings for inline-edit-rs.
//!
//! [`Settings`] holds the handful of knobs the form and view layers read at
//! construction time. [`SETTINGS`] is the process-wide instance; it falls
//! back to [`Settings::default`] until [`LazySettings::configure`] is called.

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::{InlineEditError, InlineEditResult};

/// The complete set of library settings.
///
/// # Examples
///
/// ```
/// use inline_edit_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert_eq!(settings.inline_template_name_suffix, "_inline_form");
/// assert_eq!(settings.formset_prefix_separator, "_");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The tracing filter directive, e.g. `"info"` or `"inline_edit_views=debug"`.
    pub log_level: String,
    /// Template name suffix declared by the inline update preset.
    pub inline_template_name_suffix: String,
    /// Separator between a parent form prefix and an inline relation key.
    pub formset_prefix_separator: String,
    /// Number of blank forms an inline formset adds by default.
    pub formset_default_extra: usize,
    /// Upper bound on the forms an inline formset accepts by default.
    pub formset_default_max_num: usize,
    /// Largest request body, in bytes, the view router reads before answering 400.
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: true,
            log_level: "info".to_string(),
            inline_template_name_suffix: "_inline_form".to_string(),
            formset_prefix_separator: "_".to_string(),
            formset_default_extra: 1,
            formset_default_max_num: 1000,
            max_body_bytes: 2_621_440,
        }
    }
}

/// A lazily-initialized, globally-accessible settings container.
pub struct LazySettings {
    inner: OnceLock<Settings>,
}

impl Default for LazySettings {
    fn default() -> Self {
        Self::new()
    }
}

impl LazySettings {
    /// Creates a new, unconfigured `LazySettings`.
    pub const fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    /// Configures the settings. Only the first call wins.
    pub fn configure(&self, settings: Settings) -> InlineEditResult<()> {
        self.inner.set(settings).map_err(|_| {
            InlineEditError::ConfigurationError("Settings have already been configured".to_string())
        })
    }

    /// Returns the configured settings, or the defaults if none were configured.
    pub fn get(&self) -> &Settings {
        self.inner.get_or_init(Settings::default)
    }

    /// Returns `true` if settings have been set or defaulted.
    pub fn is_configured(&self) -> bool {
        self.inner.get().is_some()
    }
}

/// The global settings instance.
pub static SETTINGS: LazySettings = LazySettings::new();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.inline_template_name_suffix, "_inline_form");
        assert_eq!(s.formset_prefix_separator, "_");
        assert_eq!(s.formset_default_extra, 1);
        assert_eq!(s.formset_default_max_num, 1000);
    }

    #[test]
    fn test_lazy_settings_configure_and_get() {
        let lazy = LazySettings::new();
        assert!(!lazy.is_configured());

        let settings = Settings {
            formset_prefix_separator: "-".to_string(),
            ..Settings::default()
        };
        lazy.configure(settings).unwrap();
        assert!(lazy.is_configured());
        assert_eq!(lazy.get().formset_prefix_separator, "-");
    }

    #[test]
    fn test_lazy_settings_double_configure_fails() {
        let lazy = LazySettings::new();
        lazy.configure(Settings::default()).unwrap();
        let err = lazy.configure(Settings::default()).unwrap_err();
        assert!(err.to_string().contains("already been configured"));
    }

    #[test]
    fn test_lazy_settings_get_defaults() {
        let lazy = LazySettings::new();
        assert_eq!(lazy.get(), &Settings::default());
        assert!(lazy.is_configured());
    }
}
