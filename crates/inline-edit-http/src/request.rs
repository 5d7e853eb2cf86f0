//! HTTP request type.
//!
//! [`HttpRequest`] carries the method, path, GET/POST parameters,
//! the positional and keyword route parameters extracted by the router, and
//! typed extensions (the authenticated user, for instance).

use std::collections::HashMap;

use http::{Extensions, Method};

use crate::querydict::QueryDict;

/// Positional and keyword parameters captured from the URL by the router.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    /// Positional arguments, in capture order.
    pub args: Vec<String>,
    /// Named keyword arguments.
    pub kwargs: HashMap<String, String>,
}

impl RouteParams {
    /// Returns a keyword argument by name.
    pub fn kwarg(&self, name: &str) -> Option<&str> {
        self.kwargs.get(name).map(String::as_str)
    }
}

/// An HTTP request.
///
/// # Examples
///
/// ```
/// use inline_edit_http::HttpRequest;
///
/// let request = HttpRequest::builder()
///     .method(http::Method::GET)
///     .path("/programs/7/")
///     .kwarg("pk", "7")
///     .build();
///
/// assert_eq!(request.path(), "/programs/7/");
/// assert_eq!(request.route().kwarg("pk"), Some("7"));
/// ```
#[derive(Debug)]
pub struct HttpRequest {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    get: QueryDict,
    post: QueryDict,
    route: RouteParams,
    extensions: Extensions,
}

impl HttpRequest {
    /// Creates a new [`HttpRequestBuilder`].
    pub fn builder() -> HttpRequestBuilder {
        HttpRequestBuilder::default()
    }

    /// Creates an `HttpRequest` from axum request parts and the body bytes.
    ///
    /// Extensions set by upstream layers (such as an authentication layer
    /// inserting the current user) are carried over.
    pub fn from_axum(parts: http::request::Parts, body: Vec<u8>) -> Self {
        let content_type = parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        HttpRequestBuilder {
            method: parts.method,
            path: parts.uri.path().to_string(),
            query_string: parts.uri.query().unwrap_or("").to_string(),
            content_type,
            body,
            route: RouteParams::default(),
            extensions: parts.extensions,
        }
        .build()
    }

    /// Returns the HTTP method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the raw query string (without the leading `?`).
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// Returns the content type of the request body, if set.
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// Returns the GET query parameters.
    pub const fn get(&self) -> &QueryDict {
        &self.get
    }

    /// Returns the POST form parameters.
    pub const fn post(&self) -> &QueryDict {
        &self.post
    }

    /// Returns the route parameters captured by the router.
    pub const fn route(&self) -> &RouteParams {
        &self.route
    }

    /// Replaces the route parameters.
    pub fn set_route(&mut self, route: RouteParams) {
        self.route = route;
    }

    /// Returns the typed extensions attached to this request.
    pub const fn extensions(&self) -> &Extensions {
        &self.extensions
    }
}

/// Builder for constructing [`HttpRequest`] instances.
#[derive(Debug)]
pub struct HttpRequestBuilder {
    method: Method,
    path: String,
    query_string: String,
    content_type: Option<String>,
    body: Vec<u8>,
    route: RouteParams,
    extensions: Extensions,
}

impl Default for HttpRequestBuilder {
    fn default() -> Self {
        Self {
            method: Method::GET,
            path: "/".to_string(),
            query_string: String::new(),
            content_type: None,
            body: Vec::new(),
            route: RouteParams::default(),
            extensions: Extensions::new(),
        }
    }
}

impl HttpRequestBuilder {
    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Sets the request path.
    #[must_use]
    pub fn path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    /// Sets the query string (without leading `?`).
    #[must_use]
    pub fn query_string(mut self, qs: &str) -> Self {
        self.query_string = qs.to_string();
        self
    }

    /// Sets the content type.
    #[must_use]
    pub fn content_type(mut self, ct: &str) -> Self {
        self.content_type = Some(ct.to_string());
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Sets a URL-encoded form body and the matching content type.
    #[must_use]
    pub fn form(self, encoded: &str) -> Self {
        self.content_type(FORM_CONTENT_TYPE)
            .body(encoded.as_bytes().to_vec())
    }

    /// Appends a positional route argument.
    #[must_use]
    pub fn arg(mut self, value: &str) -> Self {
        self.route.args.push(value.to_string());
        self
    }

    /// Adds a keyword route argument.
    #[must_use]
    pub fn kwarg(mut self, name: &str, value: &str) -> Self {
        self.route.kwargs.insert(name.to_string(), value.to_string());
        self
    }

    /// Attaches a typed extension, such as the authenticated user.
    #[must_use]
    pub fn extension<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value);
        self
    }

    /// Builds the [`HttpRequest`], decoding the query string and any form body.
    pub fn build(self) -> HttpRequest {
        let get = QueryDict::parse(&self.query_string);
        let post = if self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE))
        {
            QueryDict::parse(&String::from_utf8_lossy(&self.body))
        } else {
            QueryDict::new()
        };

        HttpRequest {
            method: self.method,
            path: self.path,
            query_string: self.query_string,
            content_type: self.content_type,
            get,
            post,
            route: self.route,
            extensions: self.extensions,
        }
    }
}

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
