//! Basic authentication middleware.
//!
//! This middleware adds an `Authorization: Basic <base64(user:pass)>` header
//! to all outgoing requests.

use std::sync::Arc;

use base64::Engine;
use bytes::Bytes;

use super::{MiddlewareFuture, RequestMiddleware};
use crate::Request;

/// Request middleware that adds HTTP basic credentials.
///
/// # Example
///
/// ```ignore
/// use courier::middleware::BasicAuthMiddleware;
///
/// session
///     .request_middlewares()
///     .add(BasicAuthMiddleware::new("username", "password"));
/// ```
#[derive(Clone)]
pub struct BasicAuthMiddleware {
    /// Full header value, `Basic <base64>`.
    header_value: Arc<str>,
}

impl BasicAuthMiddleware {
    /// Create a middleware sending `username` and `password`.
    pub fn new(username: impl AsRef<str>, password: impl AsRef<str>) -> Self {
        let credentials = format!("{}:{}", username.as_ref(), password.as_ref());
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        Self {
            header_value: Arc::from(format!("Basic {encoded}")),
        }
    }
}

impl RequestMiddleware for BasicAuthMiddleware {
    fn handle<'a>(&'a self, request: &'a mut Request<Bytes>) -> MiddlewareFuture<'a, ()> {
        Box::pin(async move { request.set_header("Authorization", &self.header_value) })
    }

    fn name(&self) -> &'static str {
        "basic_auth"
    }
}

impl std::fmt::Debug for BasicAuthMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuthMiddleware").finish_non_exhaustive()
    }
}
