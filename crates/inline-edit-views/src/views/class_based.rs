//! Class-based views.
//!
//! This module provides the [`View`] trait and the rendering mixins used by
//! the generic views. A view organizes request handling into one async
//! method per HTTP verb, with defaults that answer 405 Method Not Allowed.
//!
//! ## Key Types
//!
//! - [`View`] - The base trait for all class-based views
//! - [`ContextMixin`] - Provides rendering context data
//! - [`TemplateResponseMixin`] - Renders a context under a template name

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use inline_edit_core::ModelMeta;
use inline_edit_http::{HttpRequest, HttpResponse};

use super::function::ViewFunction;

/// The base trait for class-based views.
///
/// Provides HTTP method dispatch and default implementations that return
/// 405 Method Not Allowed. Override the specific HTTP method handlers
/// (e.g., `get`, `post`) to implement your view logic.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use inline_edit_views::View;
/// use inline_edit_http::{HttpRequest, HttpResponse};
///
/// struct Hello;
///
/// #[async_trait]
/// impl View for Hello {
///     async fn get(&self, _request: HttpRequest) -> HttpResponse {
///         HttpResponse::ok("Hello!")
///     }
/// }
/// ```
#[async_trait]
pub trait View: Send + Sync {
    /// Returns the list of HTTP methods this view allows.
    fn allowed_methods(&self) -> Vec<http::Method> {
        vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::PUT,
            http::Method::PATCH,
            http::Method::DELETE,
            http::Method::HEAD,
            http::Method::OPTIONS,
        ]
    }

    /// The resource type this view operates on, if any.
    ///
    /// Predicate factories receive this for each branch of a conditional
    /// dispatch.
    fn model(&self) -> Option<&ModelMeta> {
        None
    }

    /// Dispatches the request to the appropriate HTTP method handler.
    async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        match *request.method() {
            http::Method::GET => self.get(request).await,
            http::Method::POST => self.post(request).await,
            http::Method::PUT => self.put(request).await,
            http::Method::PATCH => self.patch(request).await,
            http::Method::DELETE => self.delete(request).await,
            http::Method::HEAD => self.head(request).await,
            http::Method::OPTIONS => self.options(request).await,
            _ => self.http_method_not_allowed(request).await,
        }
    }

    /// Handles GET requests. Returns 405 by default.
    async fn get(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles POST requests. Returns 405 by default.
    async fn post(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles PUT requests. Returns 405 by default.
    async fn put(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles PATCH requests. Returns 405 by default.
    async fn patch(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles DELETE requests. Returns 405 by default.
    async fn delete(&self, request: HttpRequest) -> HttpResponse {
        self.http_method_not_allowed(request).await
    }

    /// Handles HEAD requests. Delegates to `get` by default.
    async fn head(&self, request: HttpRequest) -> HttpResponse {
        self.get(request).await
    }

    /// Handles OPTIONS requests. Returns the list of allowed methods.
    async fn options(&self, _request: HttpRequest) -> HttpResponse {
        let methods = self.allowed_methods();
        let method_strs: Vec<&str> = methods.iter().map(http::Method::as_str).collect();
        let mut response = HttpResponse::ok("");
        if let Ok(value) = http::header::HeaderValue::from_str(&method_strs.join(", ")) {
            response.headers_mut().insert(http::header::ALLOW, value);
        }
        response
    }

    /// Returns a 405 Method Not Allowed response with the allowed methods header.
    async fn http_method_not_allowed(&self, request: HttpRequest) -> HttpResponse {
        tracing::debug!(method = %request.method(), path = request.path(), "method not allowed");
        let methods = self.allowed_methods();
        let method_strs: Vec<&str> = methods.iter().map(http::Method::as_str).collect();
        HttpResponse::not_allowed(&method_strs)
    }

    /// Converts this class-based view into a view function.
    #[allow(clippy::wrong_self_convention)]
    fn as_view(self) -> ViewFunction
    where
        Self: Sized + 'static,
    {
        let view = std::sync::Arc::new(self);
        Box::new(move |request: HttpRequest| -> Pin<Box<dyn Future<Output = HttpResponse> + Send>> {
            let view = view.clone();
            Box::pin(async move { view.dispatch(request).await })
        })
    }
}

/// Mixin that provides rendering context data.
pub trait ContextMixin {
    /// Returns context data for rendering.
    ///
    /// The `kwargs` parameter contains the route's keyword parameters.
    fn get_context_data(
        &self,
        kwargs: &std::collections::HashMap<String, String>,
    ) -> BTreeMap<String, serde_json::Value>;
}

/// Mixin that renders a context under a template name.
///
/// No template engine is attached to inline-edit-rs, so rendering falls
/// back to a JSON dump of the context inside a minimal HTML page that names
/// the template.
pub trait TemplateResponseMixin: View {
    /// Returns the primary template name.
    fn template_name(&self) -> String;

    /// Returns a list of template names to try, in order.
    fn get_template_names(&self) -> Vec<String> {
        vec![self.template_name()]
    }

    /// Renders the context and returns a 200 `text/html` response.
    fn render_to_response(&self, context: BTreeMap<String, serde_json::Value>) -> HttpResponse {
        render_fallback(&self.template_name(), &context)
    }
}

/// Renders `context` as pretty JSON inside an HTML page naming `template_name`.
pub fn render_fallback(
    template_name: &str,
    context: &BTreeMap<String, serde_json::Value>,
) -> HttpResponse {
    let context_json = serde_json::to_string_pretty(context).unwrap_or_default();
    let body = format!(
        "<!-- Template: {template_name} -->\n<html><body><pre>{context_json}</pre></body></html>"
    );
    let mut response = HttpResponse::ok(body);
    response.set_content_type("text/html");
    response
}

/// Extracts the JSON context embedded by [`render_fallback`].
///
/// Returns `None` if the body was not produced by the fallback renderer.
pub fn fallback_context(response: &HttpResponse) -> Option<serde_json::Value> {
    let text = response.text();
    let start = text.find("<pre>")? + "<pre>".len();
    let end = text.rfind("</pre>")?;
    serde_json::from_str(text.get(start..end)?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestView;

    #[async_trait]
    impl View for TestView {
        async fn get(&self, _request: HttpRequest) -> HttpResponse {
            HttpResponse::ok("GET response")
        }

        async fn post(&self, _request: HttpRequest) -> HttpResponse {
            HttpResponse::ok("POST response")
        }
    }

    struct GetOnlyView;

    #[async_trait]
    impl View for GetOnlyView {
        fn allowed_methods(&self) -> Vec<http::Method> {
            vec![http::Method::GET, http::Method::HEAD]
        }

        async fn get(&self, _request: HttpRequest) -> HttpResponse {
            HttpResponse::ok("GET only")
        }
    }

    struct ProgramPage;

    #[async_trait]
    impl View for ProgramPage {
        fn model(&self) -> Option<&ModelMeta> {
            None
        }

        async fn get(&self, request: HttpRequest) -> HttpResponse {
            let context = self.get_context_data(&request.route().kwargs);
            self.render_to_response(context)
        }
    }

    impl ContextMixin for ProgramPage {
        fn get_context_data(
            &self,
            kwargs: &std::collections::HashMap<String, String>,
        ) -> BTreeMap<String, serde_json::Value> {
            kwargs
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect()
        }
    }

    impl TemplateResponseMixin for ProgramPage {
        fn template_name(&self) -> String {
            "schedule/program_page.html".to_string()
        }
    }

    fn request(method: http::Method) -> HttpRequest {
        HttpRequest::builder().method(method).build()
    }

    // ── Dispatch tests ──────────────────────────────────────────────

    #[tokio::test]
    async fn test_view_dispatch_get() {
        let response = TestView.dispatch(request(http::Method::GET)).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.content_bytes(), b"GET response");
    }

    #[tokio::test]
    async fn test_view_dispatch_post() {
        let response = TestView.dispatch(request(http::Method::POST)).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.content_bytes(), b"POST response");
    }

    #[tokio::test]
    async fn test_view_dispatch_method_not_allowed() {
        let response = TestView.dispatch(request(http::Method::DELETE)).await;
        assert_eq!(response.status(), http::StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_view_head_delegates_to_get() {
        let response = TestView.dispatch(request(http::Method::HEAD)).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.content_bytes(), b"GET response");
    }

    #[tokio::test]
    async fn test_view_options() {
        let response = TestView.dispatch(request(http::Method::OPTIONS)).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        let allow = response
            .headers()
            .get(http::header::ALLOW)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(allow.contains("GET"));
        assert!(allow.contains("POST"));
    }

    #[tokio::test]
    async fn test_view_custom_allowed_methods() {
        assert_eq!(TestView.allowed_methods().len(), 7);
        assert_eq!(GetOnlyView.allowed_methods().len(), 2);
        assert!(GetOnlyView.model().is_none());
    }

    #[tokio::test]
    async fn test_view_as_view() {
        let view_fn = TestView.as_view();
        let response = view_fn(request(http::Method::GET)).await;
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    // ── Rendering tests ─────────────────────────────────────────────

    #[tokio::test]
    async fn test_render_fallback_embeds_context() {
        let request = HttpRequest::builder()
            .method(http::Method::GET)
            .kwarg("slug", "morning")
            .build();
        let response = ProgramPage.dispatch(request).await;
        assert_eq!(response.content_type(), "text/html");
        assert!(response.text().starts_with("<!-- Template: schedule/program_page.html -->"));
        assert_eq!(
            fallback_context(&response),
            Some(serde_json::json!({"slug": "morning"}))
        );
        assert_eq!(
            ProgramPage.get_template_names(),
            vec!["schedule/program_page.html".to_string()]
        );
    }

    #[test]
    fn test_fallback_context_rejects_other_bodies() {
        assert_eq!(fallback_context(&HttpResponse::ok("plain")), None);
    }
}
