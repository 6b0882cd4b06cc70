//! The request pipeline: encode, request middlewares, transport, response
//! middlewares, decode.

use std::fmt;

use bytes::Bytes;
use http::header::CONTENT_TYPE;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, info_span};

use crate::middleware::{
    PayloadResponse, RequestMiddleware, RequestMiddlewareChain, ResponseHandler,
    ResponseMiddleware, ResponseMiddlewareChain,
};
use crate::{
    ByteStream, Decoder, Encoder, HeaderMap, JsonCodec, Request, Response, ResponsePayload,
    Result, StatusCode, StreamingResponse, StreamingTransport, Transport,
};

/// Runs requests through the middleware chains around a [`Transport`].
///
/// Both chains stay appendable for the lifetime of the session. Requests that
/// are already running keep the middlewares they started with.
///
/// # Example
///
/// ```ignore
/// use courier::prelude::*;
///
/// let session = Session::builder(HyperTransport::new())
///     .request_middleware(authenticator)
///     .response_middleware(HttpErrorMiddleware)
///     .build();
///
/// let request = Request::builder(Method::GET, "https://api.example.com/me".parse()?).build()?;
/// let user: User = session.execute(request).await?;
/// ```
pub struct Session<T, C = JsonCodec> {
    transport: T,
    codec: C,
    request_middlewares: RequestMiddlewareChain,
    response_middlewares: ResponseMiddlewareChain,
}

impl<T> Session<T> {
    /// Create a new session builder around `transport`.
    #[must_use]
    pub fn builder(transport: T) -> SessionBuilder<T> {
        SessionBuilder::new(transport)
    }
}

impl<T, C> Session<T, C> {
    /// Request middlewares, run last added first.
    #[must_use]
    pub const fn request_middlewares(&self) -> &RequestMiddlewareChain {
        &self.request_middlewares
    }

    /// Response middlewares, run first added first.
    #[must_use]
    pub const fn response_middlewares(&self) -> &ResponseMiddlewareChain {
        &self.response_middlewares
    }

    /// The underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The payload codec.
    #[must_use]
    pub const fn codec(&self) -> &C {
        &self.codec
    }
}

impl<T, C> Session<T, C>
where
    T: Transport,
{
    /// Send `request` through the pipeline.
    ///
    /// The body is the one the transport produced, untouched by response
    /// middlewares; status and headers are those returned by the response
    /// chain.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::MiddlewareAborted`] when a middleware fails
    /// - any transport error, unchanged
    pub async fn perform(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        let span = info_span!("http_request", method = %request.method(), url = %request.url());
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch(&self, mut request: Request<Bytes>) -> Result<Response<Bytes>> {
        self.request_middlewares.handle(&mut request).await?;
        let handler = self.response_middlewares.construct_handler();

        let (status, headers, body) = self.transport.perform(request.clone()).await?.into_parts();
        debug!(status = status.as_u16(), body_len = body.len(), "response received");

        let view = Response::new(status, headers, ResponsePayload::Data(body.clone()));
        let (status, headers) = inspect(&handler, view, &request).await?;
        Ok(Response::new(status, headers, body))
    }
}

impl<T, C> Session<T, C>
where
    T: Transport,
    C: Encoder,
{
    /// Encode `content` as the request body, then [`Session::perform`].
    ///
    /// The codec's content type, if any, replaces the request's `Content-Type`.
    ///
    /// # Errors
    ///
    /// Fails when `content` cannot be encoded, or as [`Session::perform`] does.
    pub async fn perform_with_content<B>(
        &self,
        request: Request<Bytes>,
        content: &B,
    ) -> Result<Response<Bytes>>
    where
        B: Serialize + ?Sized,
    {
        let request = self.encode(request, content)?;
        self.perform(request).await
    }

    fn encode<B>(&self, mut request: Request<Bytes>, content: &B) -> Result<Request<Bytes>>
    where
        B: Serialize + ?Sized,
    {
        let body = self.codec.encode(content, &request)?;
        if let Some(content_type) = self.codec.content_type() {
            request.set_header(CONTENT_TYPE.as_str(), content_type)?;
        }
        request.set_body(body);
        Ok(request)
    }
}

impl<T, C> Session<T, C>
where
    T: Transport,
    C: Decoder,
{
    /// [`Session::perform`] then decode the body.
    ///
    /// # Errors
    ///
    /// Fails as [`Session::perform`] does, or when the body does not decode.
    pub async fn execute<R>(&self, request: Request<Bytes>) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let (content, _) = self.execute_with_metadata(request).await?;
        Ok(content)
    }

    /// [`Session::execute`], also returning the response status and headers.
    ///
    /// # Errors
    ///
    /// Fails as [`Session::execute`] does.
    pub async fn execute_with_metadata<R>(
        &self,
        request: Request<Bytes>,
    ) -> Result<(R, Response<()>)>
    where
        R: DeserializeOwned,
    {
        let response = self.perform(request).await?;
        self.decode(response)
    }

    fn decode<R>(&self, response: Response<Bytes>) -> Result<(R, Response<()>)>
    where
        R: DeserializeOwned,
    {
        let content = self.codec.decode(&response)?;
        Ok((content, response.with_body(())))
    }
}

impl<T, C> Session<T, C>
where
    T: Transport,
    C: Encoder + Decoder,
{
    /// Encode `content`, perform the request, then decode the body.
    ///
    /// # Errors
    ///
    /// Fails as [`Session::perform_with_content`] or [`Session::execute`] do.
    pub async fn execute_with_content<R, B>(
        &self,
        request: Request<Bytes>,
        content: &B,
    ) -> Result<R>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let (content, _) = self
            .execute_with_content_and_metadata(request, content)
            .await?;
        Ok(content)
    }

    /// [`Session::execute_with_content`], also returning the response status
    /// and headers.
    ///
    /// # Errors
    ///
    /// Fails as [`Session::execute_with_content`] does.
    pub async fn execute_with_content_and_metadata<R, B>(
        &self,
        request: Request<Bytes>,
        content: &B,
    ) -> Result<(R, Response<()>)>
    where
        R: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.perform_with_content(request, content).await?;
        self.decode(response)
    }
}

impl<T, C> Session<T, C>
where
    T: StreamingTransport,
{
    /// Send `request` and return the body as a stream.
    ///
    /// Response middlewares see a [`ResponsePayload::Stream`] sharing the same
    /// underlying stream as the returned one, so chunks they consume are not
    /// returned again.
    ///
    /// # Errors
    ///
    /// Fails as [`Session::perform`] does.
    pub async fn bytes(&self, request: Request<Bytes>) -> Result<StreamingResponse> {
        let span = info_span!(
            "http_request",
            method = %request.method(),
            url = %request.url(),
            streaming = true
        );
        self.dispatch_streaming(request).instrument(span).await
    }

    async fn dispatch_streaming(&self, mut request: Request<Bytes>) -> Result<StreamingResponse> {
        self.request_middlewares.handle(&mut request).await?;
        let handler = self.response_middlewares.construct_handler();

        let (status, headers, stream) = self
            .transport
            .perform_streaming(request.clone())
            .await?
            .into_parts();
        debug!(status = status.as_u16(), "response head received");

        let view = Response::new(status, headers, ResponsePayload::Stream(stream.clone()));
        let (status, headers) = inspect(&handler, view, &request).await?;
        Ok(Response::<ByteStream>::new(status, headers, stream))
    }
}

impl<T, C> fmt::Debug for Session<T, C>
where
    T: fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport)
            .field("codec", &self.codec)
            .field("request_middlewares", &self.request_middlewares)
            .field("response_middlewares", &self.response_middlewares)
            .finish()
    }
}

/// Run the response chain, keeping the status and headers it produced.
async fn inspect(
    handler: &ResponseHandler,
    view: PayloadResponse,
    request: &Request<Bytes>,
) -> Result<(StatusCode, HeaderMap)> {
    let (status, headers, _) = handler.handle(view, request).await?.into_parts();
    Ok((status, headers))
}

/// Builder for [`Session`].
///
/// Everything a session needs is supplied here, before the session can serve
/// a single request.
pub struct SessionBuilder<T, C = JsonCodec> {
    transport: T,
    codec: C,
    request_middlewares: RequestMiddlewareChain,
    response_middlewares: ResponseMiddlewareChain,
}

impl<T> SessionBuilder<T> {
    /// Start a builder around `transport`, with the JSON codec.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            codec: JsonCodec,
            request_middlewares: RequestMiddlewareChain::new(),
            response_middlewares: ResponseMiddlewareChain::new(),
        }
    }
}

impl<T, C> SessionBuilder<T, C> {
    /// Use `codec` to encode request content and decode response bodies.
    #[must_use]
    pub fn codec<C2>(self, codec: C2) -> SessionBuilder<T, C2> {
        SessionBuilder {
            transport: self.transport,
            codec,
            request_middlewares: self.request_middlewares,
            response_middlewares: self.response_middlewares,
        }
    }

    /// Register a request middleware.
    #[must_use]
    pub fn request_middleware<M>(self, middleware: M) -> Self
    where
        M: RequestMiddleware + 'static,
    {
        self.request_middlewares.add(middleware);
        self
    }

    /// Register a response middleware.
    #[must_use]
    pub fn response_middleware<M>(self, middleware: M) -> Self
    where
        M: ResponseMiddleware + 'static,
    {
        self.response_middlewares.add(middleware);
        self
    }

    /// Build the session.
    #[must_use]
    pub fn build(self) -> Session<T, C> {
        Session {
            transport: self.transport,
            codec: self.codec,
            request_middlewares: self.request_middlewares,
            response_middlewares: self.response_middlewares,
        }
    }
}

impl<T, C> fmt::Debug for SessionBuilder<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuilder")
            .field("request_middlewares", &self.request_middlewares)
            .field("response_middlewares", &self.response_middlewares)
            .finish_non_exhaustive()
    }
}
