//! Error types for courier.

use std::sync::Arc;

use bytes::Bytes;
use derive_more::{Display, Error, From};
use http::StatusCode;

use crate::PayloadKind;

/// Main error type for courier operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// No locally cached credential is available.
    #[display("missing token")]
    #[from(skip)]
    MissingToken,

    /// A credential exists but is no longer valid.
    #[display("expired token")]
    #[from(skip)]
    ExpiredToken,

    /// The shared token refresh failed.
    ///
    /// Every caller that joined the same refresh receives the same cause.
    #[display("token refresh failed: {_0}")]
    #[from(skip)]
    RefreshFailed(Arc<Error>),

    /// A payload of one shape was required but the other was available.
    #[display("unexpected payload: expected {expected} body, found {found} body")]
    #[from(skip)]
    UnexpectedPayloadShape {
        /// Shape the caller required.
        expected: PayloadKind,
        /// Shape that was actually present.
        found: PayloadKind,
    },

    /// A request or response middleware failed.
    #[display("middleware `{middleware}` aborted: {source}")]
    #[from(skip)]
    MiddlewareAborted {
        /// Name of the middleware that raised the error.
        middleware: &'static str,
        /// The middleware's own error.
        source: Box<Error>,
    },

    /// HTTP-level errors (non-2xx status codes).
    #[display("HTTP error {status}")]
    #[from(skip)]
    Http {
        /// HTTP status code.
        status: StatusCode,
        /// Response body, if it was buffered.
        #[error(not(source))]
        body: Option<Bytes>,
    },

    /// Network/connection errors.
    #[display("connection error: {_0}")]
    #[from(skip)]
    Connection(#[error(not(source))] String),

    /// TLS/SSL errors.
    #[display("TLS error: {_0}")]
    #[from(skip)]
    Tls(#[error(not(source))] String),

    /// Request timeout.
    #[display("request timeout")]
    #[from(skip)]
    Timeout,

    /// The awaited operation was cancelled before it produced an outcome.
    #[display("cancelled: {_0}")]
    #[from(skip)]
    Cancelled(#[error(not(source))] String),

    /// Invalid request configuration.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "user.address.city").
        path: String,
        /// Error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an HTTP error without a body.
    #[must_use]
    pub const fn http(status: StatusCode) -> Self {
        Self::Http { status, body: None }
    }

    /// Create an HTTP error carrying the response body.
    #[must_use]
    pub const fn http_with_body(status: StatusCode, body: Bytes) -> Self {
        Self::Http {
            status,
            body: Some(body),
        }
    }

    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a cancellation error.
    #[must_use]
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap a middleware failure, naming the middleware that raised it.
    ///
    /// Errors that already went through a middleware boundary are returned
    /// unchanged so nested chains report the innermost culprit.
    #[must_use]
    pub fn middleware_aborted(middleware: &'static str, error: Self) -> Self {
        match error {
            aborted @ Self::MiddlewareAborted { .. } => aborted,
            other => Self::MiddlewareAborted {
                middleware,
                source: Box::new(other),
            },
        }
    }

    /// Returns `true` for token acquisition failures (missing or expired).
    #[must_use]
    pub const fn is_token_error(&self) -> bool {
        matches!(self, Self::MissingToken | Self::ExpiredToken)
    }

    /// Returns `true` if this is a timeout error.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Returns `true` if this is a connection error.
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// The error underneath middleware and refresh wrappers.
    #[must_use]
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        loop {
            match current {
                Self::MiddlewareAborted { source, .. } => current = &**source,
                Self::RefreshFailed(cause) => current = &**cause,
                other => return other,
            }
        }
    }

    /// Returns the HTTP status code if this is an HTTP error.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|status| status.is_client_error())
    }

    /// Returns `true` if this is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_some_and(|status| status.is_server_error())
    }

    /// Returns the response body if this is an HTTP error with a body.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Try to decode the HTTP error body as JSON.
    ///
    /// Returns `None` when there is no body or this is not an HTTP error.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> Option<Result<T>> {
        self.body().map(|body| crate::from_json(body))
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;

    #[test]
    fn error_display() {
        insta::assert_snapshot!(Error::MissingToken, @"missing token");
        insta::assert_snapshot!(
            Error::http(StatusCode::NOT_FOUND),
            @"HTTP error 404 Not Found"
        );
        insta::assert_snapshot!(
            Error::UnexpectedPayloadShape {
                expected: PayloadKind::Buffered,
                found: PayloadKind::Streaming,
            },
            @"unexpected payload: expected buffered body, found streaming body"
        );
        insta::assert_snapshot!(
            Error::middleware_aborted("auth", Error::ExpiredToken),
            @"middleware `auth` aborted: expired token"
        );
        insta::assert_snapshot!(
            Error::RefreshFailed(Arc::new(Error::Timeout)),
            @"token refresh failed: request timeout"
        );
    }

    #[test]
    fn middleware_aborted_is_not_rewrapped() {
        let inner = Error::middleware_aborted("inner", Error::MissingToken);
        let outer = Error::middleware_aborted("outer", inner);

        let_assert!(Error::MiddlewareAborted { middleware, source } = outer);
        check!(middleware == "inner");
        check!(matches!(*source, Error::MissingToken));
    }

    #[test]
    fn root_cause_peels_wrappers() {
        let err = Error::middleware_aborted(
            "auth",
            Error::RefreshFailed(Arc::new(Error::connection("refused"))),
        );

        check!(err.root_cause().is_connection());
        check!(Error::Timeout.root_cause().is_timeout());
    }

    #[test]
    fn token_error_classification() {
        check!(Error::MissingToken.is_token_error());
        check!(Error::ExpiredToken.is_token_error());
        check!(!Error::RefreshFailed(Arc::new(Error::MissingToken)).is_token_error());
        check!(!Error::Timeout.is_token_error());
    }

    #[test]
    fn error_status() {
        let err = Error::http(StatusCode::NOT_FOUND);
        check!(err.status() == Some(StatusCode::NOT_FOUND));
        check!(err.is_client_error());
        check!(!err.is_server_error());

        let err = Error::http(StatusCode::BAD_GATEWAY);
        check!(err.is_server_error());

        check!(Error::Timeout.status().is_none());
    }

    #[test]
    fn error_decode_body() {
        #[derive(Debug, PartialEq, serde::Deserialize)]
        struct ApiError {
            error: String,
        }

        let body = Bytes::from(r#"{"error": "invalid_grant"}"#);
        let err = Error::http_with_body(StatusCode::BAD_REQUEST, body);

        let_assert!(Some(Ok(decoded)) = err.decode_body::<ApiError>());
        check!(
            decoded
                == ApiError {
                    error: "invalid_grant".to_string()
                }
        );

        check!(
            Error::http(StatusCode::BAD_REQUEST)
                .decode_body::<ApiError>()
                .is_none()
        );
        check!(Error::Timeout.decode_body::<ApiError>().is_none());
    }
}
