//! # inline-edit-http
//!
//! HTTP layer for inline-edit-rs. Provides the request and response types
//! views are written against, the [`QueryDict`] used for GET/POST data, and
//! conversions to and from axum.

pub mod querydict;
pub mod request;
pub mod response;

pub use querydict::QueryDict;
pub use request::{HttpRequest, HttpRequestBuilder, RouteParams};
pub use response::{HttpResponse, HttpResponseRedirect};
