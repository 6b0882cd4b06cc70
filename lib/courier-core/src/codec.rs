//! Payload encoding and decoding.
//!
//! A session encodes typed request content with an [`Encoder`] before dispatch,
//! and decodes the response body with a [`Decoder`] once the response chain
//! has completed without error. [`JsonCodec`] is the default for both.

use bytes::Bytes;
use http::StatusCode;

use crate::{Request, Response, Result};

/// Encodes typed request content into a body.
pub trait Encoder: Send + Sync {
    /// Encode `value` as the body of `request`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be encoded.
    fn encode<T>(&self, value: &T, request: &Request<Bytes>) -> Result<Bytes>
    where
        T: serde::Serialize + ?Sized;

    /// Media type of encoded bodies, set as `Content-Type` when present.
    fn content_type(&self) -> Option<&'static str> {
        None
    }
}

/// Decodes a response body into a typed value.
pub trait Decoder: Send + Sync {
    /// Decode the body of `response`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body does not match `T`.
    fn decode<T>(&self, response: &Response<Bytes>) -> Result<T>
    where
        T: serde::de::DeserializeOwned;
}

/// JSON codec backed by `serde_json`.
///
/// A `204 No Content` response decodes as JSON `null`, so it fits `()` or any
/// `Option<T>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Encoder for JsonCodec {
    fn encode<T>(&self, value: &T, _request: &Request<Bytes>) -> Result<Bytes>
    where
        T: serde::Serialize + ?Sized,
    {
        let body = serde_json::to_vec(value)?;
        Ok(Bytes::from(body))
    }

    fn content_type(&self) -> Option<&'static str> {
        Some("application/json")
    }
}

impl Decoder for JsonCodec {
    fn decode<T>(&self, response: &Response<Bytes>) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        if response.status() == StatusCode::NO_CONTENT {
            return from_json(b"null");
        }
        from_json(response.body())
    }
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns [`crate::Error::JsonDeserialization`] with the path to the field
/// that failed (e.g. `"user.address.city"`).
pub fn from_json<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(|e| {
        crate::Error::json_deserialization(e.path().to_string(), e.inner().to_string())
    })
}
