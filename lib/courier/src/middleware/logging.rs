//! Request/response logging middleware.
//!
//! This middleware logs HTTP requests and responses using the `tracing` crate.
//! Register the same value on both chains to get both sides:
//!
//! ```ignore
//! use courier::middleware::LoggingMiddleware;
//!
//! session.request_middlewares().add(LoggingMiddleware::new());
//! session.response_middlewares().add(LoggingMiddleware::new());
//! ```

use std::time::Instant;

use bytes::Bytes;
use tracing::{Instrument, Level, debug, info, span, warn};

use super::{
    MiddlewareFuture, PayloadResponse, RequestMiddleware, ResponseContext, ResponseMiddleware,
};
use crate::{Request, ResponsePayload};

/// Log level for the logging middleware.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    /// Log at debug level (request/response details).
    Debug,
    /// Log at info level (summary only).
    #[default]
    Info,
}

/// Middleware that logs requests and responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware {
    level: LogLevel,
}

impl LoggingMiddleware {
    /// Create a new logging middleware with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a logging middleware that logs at debug level.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            level: LogLevel::Debug,
        }
    }

    /// Configured level.
    #[must_use]
    pub const fn level(&self) -> LogLevel {
        self.level
    }
}

impl RequestMiddleware for LoggingMiddleware {
    fn handle<'a>(&'a self, request: &'a mut Request<Bytes>) -> MiddlewareFuture<'a, ()> {
        Box::pin(async move {
            let method = request.method();
            let url = request.url().as_str();
            match self.level {
                LogLevel::Debug => {
                    debug!(
                        method = %method,
                        url,
                        headers = ?request.headers(),
                        body_len = request.body().map(Bytes::len),
                        "sending request"
                    );
                }
                LogLevel::Info => {
                    info!(method = %method, url, "sending request");
                }
            }
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}

impl ResponseMiddleware for LoggingMiddleware {
    fn handle<'a>(
        &'a self,
        response: PayloadResponse,
        context: ResponseContext<'a>,
    ) -> MiddlewareFuture<'a, PayloadResponse> {
        let method = context.request().method();
        let url = context.request().url().as_str();
        let span = span!(Level::INFO, "http_response", %method, url);

        Box::pin(
            async move {
                let start = Instant::now();
                if self.level == LogLevel::Debug {
                    debug!(
                        status = response.status().as_u16(),
                        streaming = matches!(response.body(), ResponsePayload::Stream(_)),
                        headers = ?response.headers(),
                        "response received"
                    );
                }

                let result = context.next(response).await;

                // Saturating conversion to u64
                let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

                match &result {
                    Ok(response) => {
                        let status = response.status().as_u16();
                        if response.status().is_success() {
                            info!(status, elapsed_ms, "request completed");
                        } else {
                            warn!(status, elapsed_ms, "request failed with HTTP error");
                        }
                    }
                    Err(err) => {
                        warn!(error = %err, elapsed_ms, "response handling failed");
                    }
                }

                result
            }
            .instrument(span),
        )
    }

    fn name(&self) -> &'static str {
        "logging"
    }
}
