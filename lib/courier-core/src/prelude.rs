//! Prelude module for convenient imports.
//!
//! ```ignore
//! use courier_core::prelude::*;
//! ```

pub use crate::{
    ByteStream, Decoder, Encoder, Error, JsonCodec, Method, Request, RequestBuilder, Response,
    ResponsePayload, Result, StatusCode, StreamingTransport, Token, Transport,
};
