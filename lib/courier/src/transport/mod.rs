//! Transports: the network call at the center of the pipeline.
//!
//! - [`HyperTransport`] - default transport over hyper-util with rustls
//! - [`ServiceTransport`] - adapts any tower [`Service`] into a [`Transport`]
//!
//! Tower layers compose below the pipeline through [`ServiceTransport`]:
//!
//! ```ignore
//! use std::time::Duration;
//! use courier::{HyperTransport, ServiceTransport};
//! use tower::ServiceBuilder;
//!
//! let service = ServiceBuilder::new()
//!     .concurrency_limit(8)
//!     .timeout(Duration::from_secs(5))
//!     .service(HyperTransport::new());
//! let transport = ServiceTransport::new(service);
//! ```

#[cfg(feature = "hyper-transport")]
mod hyper_client;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use tower::{BoxError, ServiceExt};
use tower_service::Service;

use crate::{Error, Request, Response, Result, Transport};

#[cfg(feature = "hyper-transport")]
pub use hyper_client::HyperTransport;

/// Future type for Tower Service implementations.
pub type ServiceFuture = Pin<Box<dyn Future<Output = Result<Response<Bytes>>> + Send + 'static>>;

/// A tower [`Service`] used as a [`Transport`].
///
/// The service is cloned for each request. Errors are mapped back to
/// [`Error`]: courier errors pass through, tower timeouts become
/// [`Error::Timeout`], anything else is a connection error.
pub struct ServiceTransport<S> {
    service: Mutex<S>,
}

impl<S> ServiceTransport<S> {
    /// Wrap `service`.
    pub const fn new(service: S) -> Self {
        Self {
            service: Mutex::new(service),
        }
    }
}

impl<S> Transport for ServiceTransport<S>
where
    S: Service<Request<Bytes>, Response = Response<Bytes>> + Clone + Send + 'static,
    S::Error: Into<BoxError>,
    S::Future: Send,
{
    async fn perform(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        // Lock, clone the service, and release the lock immediately
        let service = self
            .service
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        service
            .oneshot(request)
            .await
            .map_err(|err| into_error(err.into()))
    }
}

impl<S> fmt::Debug for ServiceTransport<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceTransport").finish_non_exhaustive()
    }
}

fn into_error(err: BoxError) -> Error {
    match err.downcast::<Error>() {
        Ok(err) => *err,
        Err(err) if err.is::<tower::timeout::error::Elapsed>() => Error::Timeout,
        Err(err) => Error::connection(err.to_string()),
    }
}
