//! Request and response middleware for the courier pipeline.
//!
//! A [`crate::Session`] runs every outgoing request through a
//! [`RequestMiddlewareChain`] and every response through a
//! [`ResponseMiddlewareChain`]:
//!
//! - request middlewares run **last added first**; each may mutate the request
//!   in place or fail, which aborts the rest of the chain;
//! - response middlewares run **first added first**; each one wraps the rest of
//!   the chain and reaches it through [`ResponseContext::next`]. Not calling
//!   `next` short-circuits the remaining middlewares.
//!
//! Response middlewares are meant for inspecting failures (e.g. decoding an
//! error body). A replaced payload is only seen by later middlewares: the
//! session always hands the transport's own body back to the caller.
//!
//! # Available Middlewares
//!
//! - [`BearerTokenMiddleware`] - Adds `Authorization: Bearer <token>` from a token provider
//! - [`BasicAuthMiddleware`] - Adds `Authorization: Basic <base64>` header
//! - [`LoggingMiddleware`] - Logs requests/responses using `tracing`
//! - [`HttpErrorMiddleware`] - Turns non-2xx responses into [`Error::Http`]
//! - [`crate::TokenAuthenticator`] - OAuth2 refresh coordinator, installable as a request middleware
//!
//! # Example
//!
//! ```ignore
//! use courier::middleware::{RequestMiddleware, MiddlewareFuture};
//! use courier::{Request, Result};
//!
//! struct UserAgent;
//!
//! impl RequestMiddleware for UserAgent {
//!     fn handle<'a>(&'a self, request: &'a mut Request) -> MiddlewareFuture<'a, ()> {
//!         Box::pin(async move { request.set_header("User-Agent", "courier") })
//!     }
//! }
//!
//! session.request_middlewares().add(UserAgent);
//! ```

mod basic_auth;
mod bearer_auth;
mod http_error;
mod logging;
mod request_chain;
mod response_chain;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use bytes::Bytes;

use crate::{Error, Request, Response, ResponsePayload, Result};

pub use basic_auth::BasicAuthMiddleware;
pub use bearer_auth::{BearerTokenMiddleware, TokenProvider};
pub use http_error::HttpErrorMiddleware;
pub use logging::{LogLevel, LoggingMiddleware};
pub use request_chain::RequestMiddlewareChain;
pub use response_chain::{ResponseHandler, ResponseMiddlewareChain};

/// Boxed future returned by middleware hooks.
pub type MiddlewareFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Response travelling through response middlewares.
pub type PayloadResponse = Response<ResponsePayload>;

/// Observes and optionally mutates an outgoing request.
pub trait RequestMiddleware: Send + Sync {
    /// Mutate `request` in place, or fail to abort the dispatch.
    fn handle<'a>(&'a self, request: &'a mut Request<Bytes>) -> MiddlewareFuture<'a, ()>;

    /// Name reported when this middleware aborts a chain.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Observes a response and optionally replaces the payload later middlewares see.
pub trait ResponseMiddleware: Send + Sync {
    /// Inspect `response`, delegating to the rest of the chain through
    /// `context.next(..)` as needed.
    fn handle<'a>(
        &'a self,
        response: PayloadResponse,
        context: ResponseContext<'a>,
    ) -> MiddlewareFuture<'a, PayloadResponse>;

    /// Name reported when this middleware aborts a chain.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<M: RequestMiddleware + ?Sized> RequestMiddleware for Arc<M> {
    fn handle<'a>(&'a self, request: &'a mut Request<Bytes>) -> MiddlewareFuture<'a, ()> {
        (**self).handle(request)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

impl<M: ResponseMiddleware + ?Sized> ResponseMiddleware for Arc<M> {
    fn handle<'a>(
        &'a self,
        response: PayloadResponse,
        context: ResponseContext<'a>,
    ) -> MiddlewareFuture<'a, PayloadResponse> {
        (**self).handle(response, context)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// What a response middleware knows about the exchange.
#[derive(Clone, Copy)]
pub struct ResponseContext<'a> {
    request: &'a Request<Bytes>,
    next: Next<'a>,
}

impl<'a> ResponseContext<'a> {
    /// The request as it was dispatched, after the request middlewares ran.
    #[must_use]
    pub const fn request(&self) -> &'a Request<Bytes> {
        self.request
    }

    /// Body sent with the request, if any.
    #[must_use]
    pub const fn request_body(&self) -> Option<&'a Bytes> {
        self.request.body()
    }

    /// Run the rest of the chain on `response`.
    ///
    /// May be called more than once; each call runs the remaining middlewares
    /// again on the payload it is given.
    ///
    /// # Errors
    ///
    /// Returns the first failure raised by a remaining middleware.
    pub async fn next(&self, response: PayloadResponse) -> Result<PayloadResponse> {
        self.next.run(response).await
    }
}

impl fmt::Debug for ResponseContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseContext")
            .field("method", self.request.method())
            .field("url", &self.request.url().as_str())
            .field("next", &self.next)
            .finish()
    }
}

/// Continuation for calling the next response middleware.
///
/// Past the last middleware it is an identity pass-through.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn ResponseMiddleware>],
    request: &'a Request<Bytes>,
}

impl<'a> Next<'a> {
    pub(crate) const fn new(
        middlewares: &'a [Arc<dyn ResponseMiddleware>],
        request: &'a Request<Bytes>,
    ) -> Self {
        Self {
            middlewares,
            request,
        }
    }

    /// Run the remaining middlewares on `response`.
    ///
    /// # Errors
    ///
    /// A failing middleware is reported as [`Error::MiddlewareAborted`] naming
    /// the middleware that raised it.
    pub async fn run(self, response: PayloadResponse) -> Result<PayloadResponse> {
        let Some((middleware, rest)) = self.middlewares.split_first() else {
            return Ok(response);
        };
        let context = ResponseContext {
            request: self.request,
            next: Self::new(rest, self.request),
        };
        middleware
            .handle(response, context)
            .await
            .map_err(|err| Error::middleware_aborted(middleware.name(), err))
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("remaining_middlewares", &self.middlewares.len())
            .finish()
    }
}
