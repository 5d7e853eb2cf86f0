//! Function-based views and decorators.
//!
//! This module provides the [`ViewFunction`] type alias and "decorator"
//! functions that wrap a view function with additional behavior:
//! method restrictions and an authentication check.
//!
//! # Examples
//!
//! ```
//! use inline_edit_views::{require_get, ViewFunction};
//! use inline_edit_http::HttpResponse;
//!
//! let my_view: ViewFunction = Box::new(|_req| {
//!     Box::pin(async { HttpResponse::ok("Hello!") })
//! });
//!
//! let get_only = require_get(my_view);
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use inline_edit_auth::User;
use inline_edit_http::{HttpRequest, HttpResponse};

/// The type for an async view function.
///
/// A view function takes an `HttpRequest` and returns a future that resolves
/// to an `HttpResponse`. Route parameters travel on the request itself.
pub type ViewFunction =
    Box<dyn Fn(HttpRequest) -> Pin<Box<dyn Future<Output = HttpResponse> + Send>> + Send + Sync>;

/// Returns the request's [`User`] extension, if one was attached.
///
/// Requests without one are anonymous.
pub fn request_user(request: &HttpRequest) -> Option<&User> {
    request.extensions().get::<User>()
}

/// Wraps a view function to only allow the specified HTTP methods.
///
/// If the request method is not in the allowed list, returns a 405 Method
/// Not Allowed response.
///
/// # Examples
///
/// ```
/// use inline_edit_views::{require_http_methods, ViewFunction};
/// use inline_edit_http::HttpResponse;
///
/// let my_view: ViewFunction = Box::new(|_req| {
///     Box::pin(async { HttpResponse::ok("Hello!") })
/// });
///
/// let restricted = require_http_methods(&["GET", "POST"], my_view);
/// ```
pub fn require_http_methods(methods: &[&str], view: ViewFunction) -> ViewFunction {
    let allowed: Arc<Vec<String>> = Arc::new(methods.iter().map(|m| m.to_uppercase()).collect());
    let view = Arc::new(view);

    Box::new(move |request: HttpRequest| {
        let allowed = allowed.clone();
        let view = view.clone();

        Box::pin(async move {
            let method = request.method().as_str();
            if allowed.iter().any(|m| m == method) {
                view(request).await
            } else {
                let method_strs: Vec<&str> = allowed.iter().map(String::as_str).collect();
                HttpResponse::not_allowed(&method_strs)
            }
        })
    })
}

/// Wraps a view function to only allow GET and HEAD requests.
pub fn require_get(view: ViewFunction) -> ViewFunction {
    require_http_methods(&["GET", "HEAD"], view)
}

/// Wraps a view function to only allow POST requests.
pub fn require_post(view: ViewFunction) -> ViewFunction {
    require_http_methods(&["POST"], view)
}

/// Wraps a view function to require an authenticated user.
///
/// The user is read from the request extensions. Anonymous requests get a
/// 403 Forbidden response.
pub fn login_required(view: ViewFunction) -> ViewFunction {
    let view = Arc::new(view);

    Box::new(move |request: HttpRequest| {
        let view = view.clone();

        Box::pin(async move {
            if request_user(&request).is_some_and(User::is_authenticated) {
                view(request).await
            } else {
                HttpResponse::forbidden("Login required")
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok_view() -> ViewFunction {
        Box::new(|_req| Box::pin(async { HttpResponse::ok("OK") }))
    }

    fn request(method: http::Method) -> HttpRequest {
        HttpRequest::builder().method(method).build()
    }

    // ── require_http_methods tests ──────────────────────────────────

    #[tokio::test]
    async fn test_require_http_methods_allows() {
        let view = require_http_methods(&["get", "POST"], ok_view());
        let response = view(request(http::Method::GET)).await;
        assert_eq!(response.status(), http::StatusCode::OK);
        let response = view(request(http::Method::POST)).await;
        assert_eq!(response.status(), http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_require_http_methods_rejects() {
        let view = require_http_methods(&["GET"], ok_view());
        let response = view(request(http::Method::DELETE)).await;
        assert_eq!(response.status(), http::StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(http::header::ALLOW).unwrap(),
            "GET"
        );
    }

    #[tokio::test]
    async fn test_require_get_and_post() {
        let get_only = require_get(ok_view());
        assert_eq!(
            get_only(request(http::Method::HEAD)).await.status(),
            http::StatusCode::OK
        );
        assert_eq!(
            get_only(request(http::Method::POST)).await.status(),
            http::StatusCode::METHOD_NOT_ALLOWED
        );

        let post_only = require_post(ok_view());
        assert_eq!(
            post_only(request(http::Method::GET)).await.status(),
            http::StatusCode::METHOD_NOT_ALLOWED
        );
    }

    // ── login_required tests ────────────────────────────────────────

    #[tokio::test]
    async fn test_login_required() {
        let view = login_required(ok_view());

        let response = view(request(http::Method::GET)).await;
        assert_eq!(response.status(), http::StatusCode::FORBIDDEN);

        let anonymous = HttpRequest::builder().extension(User::anonymous()).build();
        assert_eq!(view(anonymous).await.status(), http::StatusCode::FORBIDDEN);

        let alice = HttpRequest::builder().extension(User::new("alice")).build();
        assert_eq!(view(alice).await.status(), http::StatusCode::OK);
    }

    #[test]
    fn test_request_user() {
        let request = HttpRequest::builder().extension(User::new("bob")).build();
        assert_eq!(request_user(&request).map(User::get_username), Some("bob"));
        assert!(request_user(&HttpRequest::builder().build()).is_none());
    }
}
