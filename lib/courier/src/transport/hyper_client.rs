//! Default transport using hyper-util and rustls.

use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::{BodyExt, BodyStream, Full};
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::{Client, ResponseFuture, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;
use tower_service::Service;
use tracing::debug;

use super::ServiceFuture;
use crate::{
    ByteStream, ClientConfig, Error, Request, Response, Result, StreamingResponse,
    StreamingTransport, Transport,
};

type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// HTTPS connector with rustls and the Mozilla root certificates.
fn https_connector(config: &ClientConfig) -> HttpsConnector<HttpConnector> {
    let root_store: rustls::RootCertStore =
        webpki_roots::TLS_SERVER_ROOTS.iter().cloned().collect();

    let tls_config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    let mut http = HttpConnector::new();
    http.enforce_http(false);
    http.set_connect_timeout(Some(config.connect_timeout));

    let builder = HttpsConnectorBuilder::new()
        .with_tls_config(tls_config)
        .https_or_http()
        .enable_http1();
    if config.http2 {
        builder.enable_http2().wrap_connector(http)
    } else {
        builder.wrap_connector(http)
    }
}

/// Transport over a pooled hyper-util client with TLS.
///
/// Cloning is cheap: clones share the connection pool.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use courier::{ClientConfig, HyperTransport};
///
/// let transport = HyperTransport::with_config(
///     ClientConfig::builder().timeout(Duration::from_secs(10)).build(),
/// );
/// ```
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    config: ClientConfig,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Create a transport with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a transport with custom configuration.
    #[must_use]
    pub fn with_config(config: ClientConfig) -> Self {
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_idle_per_host)
            .build(https_connector(&config));

        Self { client, config }
    }

    /// Get the transport configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn build_hyper_request(request: Request<Bytes>) -> Result<http::Request<Full<Bytes>>> {
        let (method, url, headers, body) = request.into_parts();

        let body = body.map_or_else(Full::default, Full::new);
        let mut http_request = http::Request::builder()
            .method(method)
            .uri(url.as_str())
            .body(body)
            .map_err(|e| Error::invalid_request(e.to_string()))?;
        *http_request.headers_mut() = headers;

        Ok(http_request)
    }

    fn dispatch(&self, request: Request<Bytes>) -> Result<ResponseFuture> {
        let hyper_request = Self::build_hyper_request(request)?;
        debug!(
            method = %hyper_request.method(),
            uri = %hyper_request.uri(),
            "dispatching request"
        );
        Ok(self.client.request(hyper_request))
    }

    #[allow(clippy::needless_pass_by_value)]
    fn map_hyper_error(err: hyper_util::client::legacy::Error) -> Error {
        let msg = err.to_string();

        if err.is_connect() {
            return Error::connection(msg);
        }

        if msg.contains("ssl") || msg.contains("tls") || msg.contains("certificate") {
            return Error::tls(msg);
        }

        Error::connection(msg)
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    async fn perform(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let response = tokio::time::timeout(self.config.timeout, self.dispatch(request)?)
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Self::map_hyper_error)?;
        let (parts, body) = response.into_parts();

        let body = body
            .collect()
            .await
            .map_err(|e| Error::connection(e.to_string()))?
            .to_bytes();

        Ok(Response::new(parts.status, parts.headers, body))
    }
}

impl StreamingTransport for HyperTransport {
    async fn perform_streaming(&self, request: Request<Bytes>) -> Result<StreamingResponse> {
        let response = tokio::time::timeout(self.config.timeout, self.dispatch(request)?)
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(Self::map_hyper_error)?;
        let (parts, body) = response.into_parts();

        let chunks = BodyStream::new(body)
            .try_filter_map(|frame| async move { Ok(frame.into_data().ok()) })
            .map_err(|e| Error::connection(e.to_string()));

        Ok(Response::new(
            parts.status,
            parts.headers,
            ByteStream::new(chunks),
        ))
    }
}

impl Service<Request<Bytes>> for HyperTransport {
    type Response = Response<Bytes>;
    type Error = Error;
    type Future = ServiceFuture;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Bytes>) -> Self::Future {
        let transport = self.clone();
        Box::pin(async move { transport.perform(request).await })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert2::check;

    use super::*;

    #[test]
    fn transport_default() {
        let transport = HyperTransport::new();
        check!(transport.config().timeout == Duration::from_secs(30));
    }

    #[test]
    fn transport_with_config() {
        let config = ClientConfig::builder()
            .timeout(Duration::from_secs(60))
            .pool_idle_per_host(16)
            .http2(false)
            .build();
        let transport = HyperTransport::with_config(config.clone());

        check!(transport.config() == &config);
    }

    #[test]
    fn transport_is_debug() {
        let transport = HyperTransport::new();
        let debug = format!("{transport:?}");
        check!(debug.contains("HyperTransport"));
    }
}
