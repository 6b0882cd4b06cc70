//! Bearer token authentication middleware.
//!
//! This middleware adds an `Authorization: Bearer <token>` header to outgoing
//! requests, asking a [`TokenProvider`] for the token of each request.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use super::{MiddlewareFuture, RequestMiddleware};
use crate::{Error, Request, Token};

/// Supplies the token for a request, or `None` when no credential is known.
pub type TokenProvider = Arc<dyn Fn(&Request<Bytes>) -> Option<Token> + Send + Sync>;

/// Request middleware that authenticates requests with a bearer token.
///
/// Fails with [`Error::MissingToken`] when the provider has no token and with
/// [`Error::ExpiredToken`] when the token is past its expiry.
///
/// # Example
///
/// ```ignore
/// use courier::middleware::BearerTokenMiddleware;
///
/// let store = credentials.clone();
/// session
///     .request_middlewares()
///     .add(BearerTokenMiddleware::new(move |_request| store.current()));
/// ```
#[derive(Clone)]
pub struct BearerTokenMiddleware {
    provider: TokenProvider,
}

impl BearerTokenMiddleware {
    /// Create a middleware asking `provider` for each request's token.
    pub fn new<F>(provider: F) -> Self
    where
        F: Fn(&Request<Bytes>) -> Option<Token> + Send + Sync + 'static,
    {
        Self {
            provider: Arc::new(provider),
        }
    }

    /// Create a middleware that always sends `token`.
    #[must_use]
    pub fn fixed(token: Token) -> Self {
        Self::new(move |_| Some(token.clone()))
    }
}

impl RequestMiddleware for BearerTokenMiddleware {
    fn handle<'a>(&'a self, request: &'a mut Request<Bytes>) -> MiddlewareFuture<'a, ()> {
        Box::pin(async move {
            let token = (self.provider)(request).ok_or(Error::MissingToken)?;
            if !token.is_valid() {
                return Err(Error::ExpiredToken);
            }
            request.set_header("Authorization", &token.bearer())
        })
    }

    fn name(&self) -> &'static str {
        "bearer_token"
    }
}

impl fmt::Debug for BearerTokenMiddleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerTokenMiddleware").finish_non_exhaustive()
    }
}
