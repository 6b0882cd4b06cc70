//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types and traits for easy
//! glob importing:
//!
//! ```ignore
//! use courier::prelude::*;
//! ```

#[cfg(feature = "hyper-transport")]
pub use crate::HyperTransport;
pub use crate::middleware::{
    BasicAuthMiddleware, BearerTokenMiddleware, HttpErrorMiddleware, LoggingMiddleware,
    RequestMiddleware, ResponseMiddleware,
};
pub use crate::{
    ClientConfig, Error, Method, RefreshPolicy, Request, Response, ResponsePayload, Result,
    Session, StatusCode, StreamingTransport, Token, TokenAuthenticator, Transport, header,
};
pub use serde::{Deserialize, Serialize};
