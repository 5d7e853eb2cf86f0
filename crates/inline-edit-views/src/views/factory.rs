//! Registration-time view builders.
//!
//! A [`ViewFactory`] names a kind of view, declares which options it
//! recognizes, and builds a configured [`View`] from a [`ViewOptions`] map.
//! Factories are built once when routes are registered; the views they
//! produce are shared across requests.

use std::fmt;
use std::sync::Arc;

use inline_edit_core::InlineEditResult;

use crate::options::ViewOptions;
use crate::views::class_based::View;

/// Builds configured views.
pub trait ViewFactory: Send + Sync {
    /// A short name used in log and error messages.
    fn name(&self) -> &str;

    /// Returns `true` if `option` is a configuration key this view understands.
    fn accepts_option(&self, option: &str) -> bool;

    /// Builds a view. `options` only holds names this factory accepts.
    fn build(&self, options: &ViewOptions) -> InlineEditResult<Box<dyn View>>;
}

type BuildFn = dyn Fn(&ViewOptions) -> InlineEditResult<Box<dyn View>> + Send + Sync;

/// A [`ViewFactory`] backed by a closure and a fixed list of option names.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use inline_edit_views::{FnViewFactory, View, ViewFactory, ViewOptions};
/// use inline_edit_http::{HttpRequest, HttpResponse};
///
/// struct Banner(String);
///
/// #[async_trait]
/// impl View for Banner {
///     async fn get(&self, _request: HttpRequest) -> HttpResponse {
///         HttpResponse::ok(self.0.clone())
///     }
/// }
///
/// let factory = FnViewFactory::new("banner", &["text"], |options| {
///     let text = options.get_str("text").unwrap_or("hello").to_string();
///     Ok(Box::new(Banner(text)) as Box<dyn View>)
/// });
///
/// assert!(factory.accepts_option("text"));
/// assert!(!factory.accepts_option("success_url"));
/// assert!(factory.build(&ViewOptions::new()).is_ok());
/// ```
#[derive(Clone)]
pub struct FnViewFactory {
    name: String,
    accepted: Vec<String>,
    build: Arc<BuildFn>,
}

impl FnViewFactory {
    /// Creates a factory named `name` accepting `accepted` options.
    pub fn new<F>(name: &str, accepted: &[&str], build: F) -> Self
    where
        F: Fn(&ViewOptions) -> InlineEditResult<Box<dyn View>> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            accepted: accepted.iter().map(|s| (*s).to_string()).collect(),
            build: Arc::new(build),
        }
    }
}

impl ViewFactory for FnViewFactory {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepts_option(&self, option: &str) -> bool {
        self.accepted.iter().any(|a| a == option)
    }

    fn build(&self, options: &ViewOptions) -> InlineEditResult<Box<dyn View>> {
        (self.build)(options)
    }
}

impl fmt::Debug for FnViewFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnViewFactory")
            .field("name", &self.name)
            .field("accepted", &self.accepted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inline_edit_core::InlineEditError;
    use inline_edit_http::{HttpRequest, HttpResponse};

    struct Echo(String);

    #[async_trait]
    impl View for Echo {
        async fn get(&self, _request: HttpRequest) -> HttpResponse {
            HttpResponse::ok(self.0.clone())
        }
    }

    fn echo_factory() -> FnViewFactory {
        FnViewFactory::new("echo", &["greeting"], |options| {
            let greeting = options
                .get_str("greeting")
                .ok_or_else(|| InlineEditError::ImproperlyConfigured("greeting".into()))?;
            Ok(Box::new(Echo(greeting.to_string())) as Box<dyn View>)
        })
    }

    #[test]
    fn test_accepts_option() {
        let factory = echo_factory();
        assert_eq!(factory.name(), "echo");
        assert!(factory.accepts_option("greeting"));
        assert!(!factory.accepts_option("template_name"));
    }

    #[tokio::test]
    async fn test_build_passes_options() {
        let view = echo_factory()
            .build(&ViewOptions::new().with("greeting", "hi"))
            .unwrap();
        let response = view.dispatch(HttpRequest::builder().build()).await;
        assert_eq!(response.text(), "hi");
    }

    #[test]
    fn test_build_errors_propagate() {
        let err = echo_factory().build(&ViewOptions::new()).err().unwrap();
        assert!(err.is_configuration_error());
        assert!(format!("{:?}", echo_factory()).contains("echo"));
    }
}
