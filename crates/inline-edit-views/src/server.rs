//! Serving views over HTTP with axum.
//!
//! [`ViewRouter`] mounts [`ViewFunction`]s on axum route patterns. Keyword
//! captures in the pattern (`/programs/{pk}/`) become the request's route
//! keyword arguments, and extensions inserted by upstream layers (the
//! authenticated [`User`](inline_edit_auth::User), for instance) are carried
//! onto the [`HttpRequest`]. axum names every capture, so mounted views see
//! keyword arguments only; positional arguments stay empty.
//!
//! Request bodies larger than the router's limit (`max_body_bytes` in
//! [`Settings`](inline_edit_core::Settings) by default), or that fail to
//! read, are answered with 400 before any view runs.
//!
//! # Examples
//!
//! ```
//! use inline_edit_views::server::ViewRouter;
//! use inline_edit_views::ViewFunction;
//! use inline_edit_http::HttpResponse;
//!
//! let hello: ViewFunction = Box::new(|_req| Box::pin(async { HttpResponse::ok("hi") }));
//! let router = ViewRouter::new().route("/hello/", hello);
//! assert_eq!(router.route_count(), 1);
//! let _app: axum::Router = router.into_axum_router();
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{FromRequestParts, Path, Request};
use axum::response::IntoResponse;
use axum::routing::any;

use inline_edit_core::logging::request_span;
use inline_edit_core::{InlineEditError, InlineEditResult, SETTINGS};
use inline_edit_http::{HttpRequest, HttpResponse, RouteParams};

use crate::views::function::ViewFunction;

/// A set of views mounted on route patterns.
pub struct ViewRouter {
    routes: Vec<(String, Arc<ViewFunction>)>,
    max_body_bytes: usize,
}

impl Default for ViewRouter {
    fn default() -> Self {
        Self {
            routes: Vec::new(),
            max_body_bytes: SETTINGS.get().max_body_bytes,
        }
    }
}

impl ViewRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the request body size, in bytes.
    #[must_use]
    pub const fn with_body_limit(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }

    /// Mounts `view` on `pattern` (axum syntax, e.g. `/programs/{pk}/`).
    #[must_use]
    pub fn route(mut self, pattern: &str, view: ViewFunction) -> Self {
        self.routes.push((pattern.to_string(), Arc::new(view)));
        self
    }

    /// Returns the number of mounted views.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Converts the mounted views into an axum router.
    pub fn into_axum_router(self) -> axum::Router {
        let mut router = axum::Router::new();
        let limit = self.max_body_bytes;
        for (pattern, view) in self.routes {
            let handler = move |req: Request<Body>| {
                let view = view.clone();
                async move {
                    let (mut parts, body) = req.into_parts();
                    let kwargs = match Path::<HashMap<String, String>>::from_request_parts(
                        &mut parts,
                        &(),
                    )
                    .await
                    {
                        Ok(Path(kwargs)) => kwargs,
                        Err(_) => HashMap::new(),
                    };
                    let body_bytes = match axum::body::to_bytes(body, limit).await {
                        Ok(bytes) => bytes.to_vec(),
                        Err(e) => {
                            tracing::warn!(
                                path = parts.uri.path(),
                                limit,
                                error = %e,
                                "unreadable request body"
                            );
                            return HttpResponse::bad_request(format!(
                                "Request body unreadable or larger than {limit} bytes"
                            ))
                            .into_response();
                        }
                    };

                    let mut request = HttpRequest::from_axum(parts, body_bytes);
                    request.set_route(RouteParams {
                        args: Vec::new(),
                        kwargs,
                    });

                    let span = request_span(request.method().as_str(), request.path());
                    let response = tracing::Instrument::instrument(view(request), span).await;
                    response.into_response()
                }
            };
            router = router.route(&pattern, any(handler));
        }
        router
    }

    /// Serves the mounted views on `addr` until the server stops.
    pub async fn run(self, addr: &str) -> InlineEditResult<()> {
        let router = self.into_axum_router();
        let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
            InlineEditError::ImproperlyConfigured(format!("Failed to bind to {addr}: {e}"))
        })?;
        tracing::info!(%addr, "serving views");
        axum::serve(listener, router)
            .await
            .map_err(|e| InlineEditError::InternalServerError(format!("Server error: {e}")))
    }
}

impl fmt::Debug for ViewRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewRouter")
            .field(
                "routes",
                &self.routes.iter().map(|(p, _)| p.as_str()).collect::<Vec<_>>(),
            )
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn echo_pk() -> ViewFunction {
        Box::new(|req: HttpRequest| {
            Box::pin(async move {
                let pk = req.route().kwarg("pk").unwrap_or("none").to_string();
                HttpResponse::ok(format!("pk={pk}"))
            })
        })
    }

    #[test]
    fn test_router_debug_lists_routes() {
        let router = ViewRouter::new()
            .route("/programs/{pk}/", echo_pk())
            .route("/about/", echo_pk());
        assert_eq!(router.route_count(), 2);
        assert!(format!("{router:?}").contains("/programs/{pk}/"));
    }

    #[tokio::test]
    async fn test_run_invalid_address() {
        let result = ViewRouter::new().run("not an address").await;
        assert!(matches!(result, Err(InlineEditError::ImproperlyConfigured(_))));
    }

    async fn send(router: axum::Router, raw_request: String) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(raw_request.as_bytes()).await.unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        raw
    }

    fn post(body: &str) -> String {
        format!(
            "POST /programs/7/ HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             Content-Length: {}\r\n\r\n{body}",
            body.len()
        )
    }

    #[tokio::test]
    async fn test_oversized_body_is_bad_request() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();
        let view: ViewFunction = Box::new(move |req: HttpRequest| {
            counted.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                HttpResponse::ok(format!("name={}", req.post().get("name").unwrap_or("")))
            })
        });
        let router = ViewRouter::new()
            .with_body_limit(16)
            .route("/programs/{pk}/", view)
            .into_axum_router();

        let raw = send(router.clone(), post("name=Morning")).await;
        assert!(raw.ends_with("name=Morning"), "got: {raw}");

        let raw = send(router, post(&format!("name={}", "x".repeat(64)))).await;
        assert!(raw.starts_with("HTTP/1.1 400"), "got: {raw}");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_body_limit_defaults_to_settings() {
        let router = ViewRouter::new();
        assert_eq!(router.max_body_bytes, SETTINGS.get().max_body_bytes);
    }

    #[tokio::test]
    async fn test_serves_route_kwargs() {
        let router = ViewRouter::new()
            .route("/programs/{pk}/", echo_pk())
            .into_axum_router();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /programs/7/ HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200"), "got: {raw}");
        assert!(raw.ends_with("pk=7"), "got: {raw}");
    }
}
