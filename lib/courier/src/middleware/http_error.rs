//! Turns non-2xx responses into [`Error::Http`].

use super::{MiddlewareFuture, PayloadResponse, ResponseContext, ResponseMiddleware};
use crate::{Error, ResponsePayload};

/// Response middleware failing every non-2xx response.
///
/// The rest of the chain runs first, so middlewares added after this one can
/// still inspect error bodies. Buffered bodies are attached to the error;
/// streaming ones are left unread.
///
/// ```ignore
/// use courier::middleware::HttpErrorMiddleware;
///
/// session.response_middlewares().add(HttpErrorMiddleware);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpErrorMiddleware;

impl ResponseMiddleware for HttpErrorMiddleware {
    fn handle<'a>(
        &'a self,
        response: PayloadResponse,
        context: ResponseContext<'a>,
    ) -> MiddlewareFuture<'a, PayloadResponse> {
        Box::pin(async move {
            let response = context.next(response).await?;
            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }
            match response.into_body() {
                ResponsePayload::Data(body) if !body.is_empty() => {
                    Err(Error::http_with_body(status, body))
                }
                ResponsePayload::Data(_) | ResponsePayload::Stream(_) => Err(Error::http(status)),
            }
        })
    }

    fn name(&self) -> &'static str {
        "http_error"
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use bytes::Bytes;
    use futures_util::stream;

    use super::*;
    use crate::middleware::ResponseMiddlewareChain;
    use crate::{ByteStream, HeaderMap, Method, Request, Response, StatusCode};

    fn request() -> Request<Bytes> {
        let url = url::Url::parse("https://api.example.com/items/7").expect("url");
        Request::builder(Method::GET, url).build().expect("request")
    }

    async fn run(response: PayloadResponse) -> crate::Result<PayloadResponse> {
        let chain = ResponseMiddlewareChain::new();
        chain.add(HttpErrorMiddleware);
        chain.construct_handler().handle(response, &request()).await
    }

    #[tokio::test]
    async fn success_passes_through() {
        let response = Response::new(
            StatusCode::OK,
            HeaderMap::new(),
            ResponsePayload::Data(Bytes::from_static(b"{}")),
        );

        let result = run(response).await.expect("success");

        check!(result.status() == StatusCode::OK);
    }

    #[tokio::test]
    async fn buffered_error_keeps_body() {
        let response = Response::new(
            StatusCode::NOT_FOUND,
            HeaderMap::new(),
            ResponsePayload::Data(Bytes::from_static(br#"{"error":"no such item"}"#)),
        );

        let result = run(response).await;

        let_assert!(Err(Error::MiddlewareAborted { middleware, source }) = result);
        check!(middleware == "http_error");
        check!(source.status() == Some(StatusCode::NOT_FOUND));
        let_assert!(Some(Ok(body)) = source.decode_body::<serde_json::Value>());
        check!(body["error"] == "no such item");
    }

    #[tokio::test]
    async fn streaming_error_has_no_body() {
        let stream = ByteStream::new(stream::iter(vec![Ok(Bytes::from_static(b"oops"))]));
        let response = Response::new(
            StatusCode::SERVICE_UNAVAILABLE,
            HeaderMap::new(),
            ResponsePayload::Stream(stream),
        );

        let result = run(response).await;

        let_assert!(Err(err) = result);
        check!(err.root_cause().is_server_error());
        check!(err.root_cause().body().is_none());
    }
}
