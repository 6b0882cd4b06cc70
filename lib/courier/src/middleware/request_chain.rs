//! Ordered request middlewares.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use bytes::Bytes;

use super::RequestMiddleware;
use crate::{Error, Request, Result};

/// Ordered collection of request middlewares.
///
/// Middlewares run in reverse registration order: the most recently added one
/// sees the request first.
#[derive(Default)]
pub struct RequestMiddlewareChain {
    middlewares: RwLock<Vec<Arc<dyn RequestMiddleware>>>,
}

impl RequestMiddlewareChain {
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a middleware. It will run before every middleware added earlier.
    ///
    /// Invocations already in progress keep the list they started with.
    pub fn add<M>(&self, middleware: M)
    where
        M: RequestMiddleware + 'static,
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

    fn snapshot(&self) -> Vec<Arc<dyn RequestMiddleware>> {
        self.middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run every middleware on `request`, last added first.
    ///
    /// # Errors
    ///
    /// The first failure stops the chain and is returned as
    /// [`Error::MiddlewareAborted`]. Mutations made by middlewares that already
    /// ran stay on the request, so it should be discarded.
    pub async fn handle(&self, request: &mut Request<Bytes>) -> Result<()> {
        for middleware in self.snapshot().iter().rev() {
            middleware
                .handle(request)
                .await
                .map_err(|err| Error::middleware_aborted(middleware.name(), err))?;
        }
        Ok(())
    }
}

impl fmt::Debug for RequestMiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestMiddlewareChain")
            .field("middleware_count", &self.len())
            .finish()
    }
}
