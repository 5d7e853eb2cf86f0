//! Core error types for inline-edit-rs.
//!
//! [`InlineEditError`] covers the lookup, persistence, validation and
//! configuration failures the form and view layers can raise. Registration
//! mistakes (a conditional view with no branch, a predicate factory that
//! yields nothing) surface as [`InlineEditError::ImproperlyConfigured`] or
//! [`InlineEditError::TypeConfiguration`] and are meant for the developer,
//! never for the end user.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Represents a validation error with optional field-level errors.
///
/// # Examples
///
/// ```
/// use inline_edit_core::error::ValidationError;
///
/// let err = ValidationError::new("This field is required.", "required");
/// assert_eq!(err.to_string(), "This field is required.");
///
/// let mut field_errors = std::collections::BTreeMap::new();
/// field_errors.insert("title".to_string(), vec!["Too long.".to_string()]);
/// let err = ValidationError::with_field_errors(field_errors);
/// assert_eq!(err.to_string(), "title: Too long.");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The primary error message.
    pub message: String,
    /// A short code identifying the failure (e.g. "required", "invalid").
    pub code: String,
    /// Per-field error messages, keyed by field name.
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            field_errors: BTreeMap::new(),
        }
    }

    /// Creates a `ValidationError` containing per-field errors.
    pub fn with_field_errors(field_errors: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            message: String::new(),
            code: "invalid".to_string(),
            field_errors,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.message.is_empty() {
            return write!(f, "{}", self.message);
        }
        let mut first = true;
        for (field, errors) in &self.field_errors {
            for error in errors {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {error}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for inline-edit-rs.
///
/// Each variant maps to an HTTP status code via [`InlineEditError::status_code`].
#[derive(Error, Debug)]
pub enum InlineEditError {
    // ── HTTP errors ──────────────────────────────────────────────────

    /// HTTP 404 Not Found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 500 Internal Server Error.
    #[error("Internal server error: {0}")]
    InternalServerError(String),

    // ── Persistence errors ───────────────────────────────────────────

    /// A lookup expected exactly one record but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A storage integrity constraint was violated.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    // ── Validation ───────────────────────────────────────────────────

    /// One or more fields failed validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Configuration ────────────────────────────────────────────────

    /// A settings value is missing or invalid, or a settings file failed to load.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A view or form was registered without something it needs.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    /// A registration value has the wrong shape: a predicate factory that
    /// produced no callable, or a shared option that cannot be compared.
    #[error("Type configuration error: {0}")]
    TypeConfiguration(String),
}

impl InlineEditError {
    /// Returns the HTTP status code associated with this error.
    ///
    /// - `ValidationError` -> 400
    /// - `NotFound`, `DoesNotExist` -> 404
    /// - Everything else -> 500
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::ValidationError(_) => 400,
            Self::NotFound(_) | Self::DoesNotExist(_) => 404,
            Self::InternalServerError(_)
            | Self::IntegrityError(_)
            | Self::ConfigurationError(_)
            | Self::ImproperlyConfigured(_)
            | Self::TypeConfiguration(_) => 500,
        }
    }

    /// Returns `true` for errors that indicate a registration or deployment
    /// defect rather than a bad request.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationError(_) | Self::ImproperlyConfigured(_) | Self::TypeConfiguration(_)
        )
    }
}

impl From<ValidationError> for InlineEditError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

/// A convenience type alias for `Result<T, InlineEditError>`.
pub type InlineEditResult<T> = Result<T, InlineEditError>;
