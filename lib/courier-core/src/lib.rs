//! Core types and traits for the courier HTTP pipeline.
//!
//! This crate provides the foundational types used by courier:
//! - [`Request`] and [`RequestBuilder`] - HTTP request types
//! - [`Response`], [`ResponsePayload`] and [`ByteStream`] - response types
//! - [`Token`] - bearer credential with an absolute expiry
//! - [`Error`] and [`Result`] - Error handling
//! - [`Transport`] and [`StreamingTransport`] - capability traits for the network layer
//! - [`Encoder`], [`Decoder`] and [`JsonCodec`] - payload codecs
//! - [`Method`], [`StatusCode`] and [`header`] - re-exported from the `http` crate

mod codec;
mod error;
mod payload;
pub mod prelude;
mod request;
mod response;
mod token;
mod transport;

pub use codec::{Decoder, Encoder, JsonCodec, from_json};
pub use error::{Error, Result};
pub use payload::{
    ByteStream, PayloadKind, ResponsePayload, StreamingBody, StreamingResponse,
};
pub use request::{Request, RequestBuilder};
pub use response::Response;
pub use token::Token;
pub use transport::{StreamingTransport, Transport};

// Re-export http crate types for methods, status codes and headers
pub use http::{HeaderMap, Method, StatusCode, header};

// Re-export time so callers can build token expiries
pub use time;
