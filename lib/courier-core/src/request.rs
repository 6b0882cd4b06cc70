//! HTTP request building.
//!
//! Use [`Request::builder`] to construct requests with headers, query parameters, and bodies.
//!
//! # Example
//!
//! ```
//! use courier_core::{Method, Request};
//! use bytes::Bytes;
//!
//! let request = Request::<Bytes>::builder(Method::GET, "https://api.example.com".parse().unwrap())
//!     .header("Accept", "application/json")
//!     .query("page", "1")
//!     .build()
//!     .unwrap();
//! ```

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};

use crate::{Error, Result};

/// An HTTP request with method, URL, headers, and optional body.
#[derive(Debug, Clone)]
pub struct Request<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HeaderMap,
    body: Option<B>,
}

impl<B> Request<B> {
    /// Creates a new [`RequestBuilder`].
    #[must_use]
    pub fn builder(method: Method, url: url::Url) -> RequestBuilder<B> {
        RequestBuilder::new(method, url)
    }

    /// HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URL.
    #[must_use]
    pub fn url(&self) -> &url::Url {
        &self.url
    }

    /// Request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
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

    /// Replace a header value.
    ///
    /// `Authorization` values are flagged as sensitive so they stay out of logs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if the name or value is not a valid header.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Request body.
    #[must_use]
    pub const fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    /// Replace the request body.
    pub fn set_body(&mut self, body: B) {
        self.body = Some(body);
    }

    /// Consume into (method, url, headers, body).
    #[must_use]
    pub fn into_parts(self) -> (Method, url::Url, HeaderMap, Option<B>) {
        (self.method, self.url, self.headers, self.body)
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue)> {
    let name = HeaderName::try_from(name)
        .map_err(|err| Error::invalid_request(format!("header name `{name}`: {err}")))?;
    let mut value = HeaderValue::try_from(value)
        .map_err(|err| Error::invalid_request(format!("header `{name}`: {err}")))?;
    if name == AUTHORIZATION {
        value.set_sensitive(true);
    }
    Ok((name, value))
}

/// Builder for constructing [`Request`] instances.
///
/// Invalid headers are reported by [`RequestBuilder::build`].
#[derive(Debug)]
pub struct RequestBuilder<B = Bytes> {
    method: Method,
    url: url::Url,
    headers: HeaderMap,
    body: Option<B>,
    error: Option<Error>,
}

impl<B> RequestBuilder<B> {
    /// Creates a new builder.
    #[must_use]
    pub fn new(method: Method, url: url::Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    /// Sets a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_none() {
            match parse_header(name, value) {
                Ok((name, value)) => {
                    self.headers.insert(name, value);
                }
                Err(err) => self.error = Some(err),
            }
        }
        self
    }

    /// Appends a query parameter to the URL.
    #[must_use]
    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.url.query_pairs_mut().append_pair(name, value);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn body(mut self, body: B) -> Self {
        self.body = Some(body);
        self
    }

    /// Builds the [`Request`].
    ///
    /// # Errors
    ///
    /// Returns the first invalid header encountered while building.
    pub fn build(self) -> Result<Request<B>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Request {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        })
    }
}

impl RequestBuilder<Bytes> {
    /// Set a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(self
            .header(CONTENT_TYPE.as_str(), "application/json")
            .body(Bytes::from(body)))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    fn url(path: &str) -> url::Url {
        url::Url::parse(&format!("https://api.example.com{path}")).expect("valid URL")
    }

    #[test]
    fn request_builder_basic() {
        let request = Request::<Bytes>::builder(Method::GET, url("/users"))
            .header("Accept", "application/json")
            .build()
            .expect("request");

        check!(request.method() == Method::GET);
        check!(request.url().as_str() == "https://api.example.com/users");
        check!(request.header("accept") == Some("application/json"));
        check!(request.body().is_none());
    }

    #[test]
    fn request_builder_with_query() {
        let request = Request::<Bytes>::builder(Method::GET, url("/users"))
            .query("page", "1")
            .query("limit", "10")
            .build()
            .expect("request");

        check!(request.url().as_str() == "https://api.example.com/users?page=1&limit=10");
    }

    #[test]
    fn request_builder_reports_invalid_header() {
        let result = Request::<Bytes>::builder(Method::GET, url("/"))
            .header("bad header", "value")
            .build();

        let_assert!(Err(Error::InvalidRequest(message)) = result);
        check!(message.contains("bad header"));
    }

    #[test]
    fn request_builder_json() {
        #[derive(serde::Serialize)]
        struct Grant<'a> {
            grant_type: &'a str,
        }

        let request = Request::builder(Method::POST, url("/token"))
            .json(&Grant {
                grant_type: "refresh_token",
            })
            .expect("json")
            .build()
            .expect("request");

        check!(request.header("Content-Type") == Some("application/json"));
        check!(
            request.body()
                == Some(&Bytes::from_static(br#"{"grant_type":"refresh_token"}"#))
        );
    }

    #[test]
    fn set_header_marks_authorization_sensitive() {
        let mut request = Request::<Bytes>::builder(Method::GET, url("/me"))
            .build()
            .expect("request");

        request
            .set_header("Authorization", "Bearer abc")
            .expect("valid header");

        let_assert!(Some(value) = request.headers().get(AUTHORIZATION));
        check!(value.is_sensitive());
        check!(request.header("authorization") == Some("Bearer abc"));
    }
}
