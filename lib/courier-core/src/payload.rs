//! Response payloads as seen by response middlewares.
//!
//! A transport produces either buffered bytes or a chunk stream. Both are
//! wrapped in [`ResponsePayload`] so middlewares can inspect them uniformly.

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use derive_more::Display;
use futures_core::Stream;
use futures_util::StreamExt;
use futures_util::lock::Mutex;

use crate::{Error, Response, Result};

/// A streaming body: chunks of bytes arriving over time.
pub type StreamingBody = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Response whose body is a [`ByteStream`].
pub type StreamingResponse = Response<ByteStream>;

/// Shape of a response payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum PayloadKind {
    /// Fully buffered bytes.
    #[display("buffered")]
    Buffered,
    /// Chunk stream.
    #[display("streaming")]
    Streaming,
}

/// Cloneable handle onto a single chunk stream.
///
/// Every clone reads from the same underlying stream: a chunk consumed through
/// one handle is gone for all of them.
#[derive(Clone)]
pub struct ByteStream {
    inner: Arc<Mutex<StreamingBody>>,
}

impl ByteStream {
    /// Wrap a chunk stream.
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self::from_body(Box::pin(stream))
    }

    /// Wrap an already boxed chunk stream.
    #[must_use]
    pub fn from_body(body: StreamingBody) -> Self {
        Self {
            inner: Arc::new(Mutex::new(body)),
        }
    }

    /// Next chunk, or `None` once the stream is exhausted.
    pub async fn next_chunk(&self) -> Option<Result<Bytes>> {
        self.inner.lock().await.next().await
    }

    /// Buffer the remaining chunks.
    ///
    /// # Errors
    ///
    /// Returns the first chunk error.
    pub async fn collect(&self) -> Result<Bytes> {
        let mut body = self.inner.lock().await;
        let mut collected = BytesMut::new();
        while let Some(chunk) = body.next().await {
            collected.extend_from_slice(&chunk?);
        }
        Ok(collected.freeze())
    }

    /// Returns `true` if both handles read from the same stream.
    #[must_use]
    pub fn same_stream(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream").finish_non_exhaustive()
    }
}

impl Response<ByteStream> {
    /// Buffer the entire stream into a [`Response`] with a [`Bytes`] body.
    ///
    /// # Errors
    ///
    /// Returns an error if reading any chunk fails.
    pub async fn collect(self) -> Result<Response<Bytes>> {
        let bytes = self.body().collect().await?;
        Ok(self.with_body(bytes))
    }
}

/// Body of a response travelling through response middlewares.
#[derive(Debug, Clone)]
pub enum ResponsePayload {
    /// Buffered bytes.
    Data(Bytes),
    /// Chunk stream.
    Stream(ByteStream),
}

impl ResponsePayload {
    /// Shape of this payload.
    #[must_use]
    pub const fn kind(&self) -> PayloadKind {
        match self {
            Self::Data(_) => PayloadKind::Buffered,
            Self::Stream(_) => PayloadKind::Streaming,
        }
    }

    /// Buffered bytes of this payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedPayloadShape`] for a streaming payload.
    pub fn require_data(&self) -> Result<&Bytes> {
        match self {
            Self::Data(bytes) => Ok(bytes),
            Self::Stream(_) => Err(Error::UnexpectedPayloadShape {
                expected: PayloadKind::Buffered,
                found: PayloadKind::Streaming,
            }),
        }
    }

    /// Stream of this payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnexpectedPayloadShape`] for a buffered payload.
    pub fn require_stream(&self) -> Result<&ByteStream> {
        match self {
            Self::Stream(stream) => Ok(stream),
            Self::Data(_) => Err(Error::UnexpectedPayloadShape {
                expected: PayloadKind::Streaming,
                found: PayloadKind::Buffered,
            }),
        }
    }
}

impl From<Bytes> for ResponsePayload {
    fn from(bytes: Bytes) -> Self {
        Self::Data(bytes)
    }
}

impl From<ByteStream> for ResponsePayload {
    fn from(stream: ByteStream) -> Self {
        Self::Stream(stream)
    }
}
