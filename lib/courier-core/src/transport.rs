//! Transport capability traits.
//!
//! - [`Transport`] - performs a request and buffers the response body
//! - [`StreamingTransport`] - performs a request and hands back the body as a stream
//!
//! Transports own everything below the pipeline: connections, TLS, socket-level
//! retries and timeouts. Implement them directly for tests or custom stacks.

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;

use crate::{Request, Response, Result, StreamingResponse};

/// Performs HTTP exchanges with a buffered response body.
///
/// # Example
///
/// ```ignore
/// use courier_core::{Request, Response, Result, Transport};
///
/// struct Canned(Response);
///
/// impl Transport for Canned {
///     async fn perform(&self, _request: Request) -> Result<Response> {
///         Ok(self.0.clone())
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Send `request` (its body, if any, included) and return the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any reason:
    /// - Network errors
    /// - TLS errors
    /// - Timeouts
    /// - Invalid response
    fn perform(&self, request: Request<Bytes>)
    -> impl Future<Output = Result<Response<Bytes>>> + Send;
}

/// Performs HTTP exchanges with a streaming response body.
pub trait StreamingTransport: Transport {
    /// Send `request` and return the response once its head has arrived.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Transport::perform`].
    fn perform_streaming(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<StreamingResponse>> + Send;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn perform(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<Response<Bytes>>> + Send {
        (**self).perform(request)
    }
}

impl<T: StreamingTransport + ?Sized> StreamingTransport for Arc<T> {
    fn perform_streaming(
        &self,
        request: Request<Bytes>,
    ) -> impl Future<Output = Result<StreamingResponse>> + Send {
        (**self).perform_streaming(request)
    }
}
