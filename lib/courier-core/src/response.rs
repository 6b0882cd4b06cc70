//! HTTP response handling.
//!
//! [`Response`] carries the status, headers and a body. The body is raw
//! [`Bytes`] when it comes from a transport and a [`crate::ResponsePayload`]
//! while it travels through response middlewares.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// HTTP response with status, headers, and body.
#[derive(Debug, Clone)]
pub struct Response<B = Bytes> {
    status: StatusCode,
    headers: HeaderMap,
    body: B,
}

impl<B> Response<B> {
    /// Creates a new response.
    #[must_use]
    pub const fn new(status: StatusCode, headers: HeaderMap, body: B) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// HTTP status code.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to headers.
    #[must_use]
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Single header value by name, if it is valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    /// Response body.
    #[must_use]
    pub const fn body(&self) -> &B {
        &self.body
    }

    /// Consume into body.
    #[must_use]
    pub fn into_body(self) -> B {
        self.body
    }

    /// Consume into (status, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, B) {
        (self.status, self.headers, self.body)
    }

    /// Status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Transform the body with a function.
    pub fn map_body<F, B2>(self, f: F) -> Response<B2>
    where
        F: FnOnce(B) -> B2,
    {
        Response {
            status: self.status,
            headers: self.headers,
            body: f(self.body),
        }
    }

    /// Keep this response's status and headers but replace its body.
    #[must_use]
    pub fn with_body<B2>(self, body: B2) -> Response<B2> {
        self.map_body(|_| body)
    }
}

impl Response<Bytes> {
    /// Deserialize the response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        crate::from_json(&self.body)
    }

    /// Get the response body as text.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not valid UTF-8.
    pub fn text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.body)
    }
}
