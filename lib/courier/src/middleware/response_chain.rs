//! Ordered response middlewares composed into a chain of responsibility.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;

use super::{Next, PayloadResponse, ResponseMiddleware};
use crate::{Request, Result};

/// Ordered collection of response middlewares.
///
/// The first middleware added is the outermost one: it sees the response first
/// and reaches the others through `next`.
#[derive(Default)]
pub struct ResponseMiddlewareChain {
    middlewares: RwLock<Vec<Arc<dyn ResponseMiddleware>>>,
}

impl ResponseMiddlewareChain {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware, innermost so far.
    pub fn add<M>(&self, middleware: M)
    where
        M: ResponseMiddleware + 'static,
    {
        self.middlewares
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(middleware));
    }

    /// Number of registered middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no middleware is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build a handler over the middlewares registered right now.
    ///
    /// Middlewares added afterwards are not seen by the returned handler.
    #[must_use]
    pub fn construct_handler(&self) -> ResponseHandler {
        let middlewares = self
            .middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();
        ResponseHandler { middlewares }
    }
}

impl fmt::Debug for ResponseMiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseMiddlewareChain")
            .field("middleware_count", &self.len())
            .finish()
    }
}

/// Composed response chain for one dispatch.
///
/// With no middleware it returns the response unchanged.
#[derive(Clone)]
pub struct ResponseHandler {
    middlewares: Arc<[Arc<dyn ResponseMiddleware>]>,
}

impl ResponseHandler {
    /// Run the chain on `response` produced for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MiddlewareAborted`] naming the middleware that
    /// failed.
    pub async fn handle(
        &self,
        response: PayloadResponse,
        request: &Request<Bytes>,
    ) -> Result<PayloadResponse> {
        Next::new(&self.middlewares, request).run(response).await
    }
}

impl fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("middleware_count", &self.middlewares.len())
            .finish()
    }
}
