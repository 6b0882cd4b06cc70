//! HTTP request/response pipeline with middleware chains and single-flight
//! token refresh.
//!
//! A [`Session`] sends each request through three stages:
//!
//! 1. the [`RequestMiddlewareChain`](middleware::RequestMiddlewareChain), most
//!    recently added middleware first;
//! 2. a [`Transport`] ([`HyperTransport`] by default);
//! 3. the [`ResponseMiddlewareChain`](middleware::ResponseMiddlewareChain),
//!    first added middleware outermost.
//!
//! [`TokenAuthenticator`] keeps OAuth2 tokens fresh: concurrent requests that
//! find the token expired share a single refresh.
//!
//! # Example
//!
//! ```ignore
//! use courier::prelude::*;
//!
//! #[derive(Debug, Deserialize)]
//! pub struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! let authenticator = TokenAuthenticator::new(policy, HyperTransport::new());
//! let session = Session::builder(HyperTransport::new())
//!     .request_middleware(authenticator)
//!     .response_middleware(HttpErrorMiddleware)
//!     .build();
//!
//! let request = Request::builder(Method::GET, "https://api.example.com/users/42".parse()?)
//!     .build()?;
//! let user: User = session.execute(request).await?;
//! ```

mod auth;
mod config;
pub mod middleware;
pub mod prelude;
mod session;
mod transport;

pub use auth::{RefreshPolicy, TokenAuthenticator};
pub use config::{ClientConfig, ClientConfigBuilder};
pub use session::{Session, SessionBuilder};
#[cfg(feature = "hyper-transport")]
pub use transport::HyperTransport;
pub use transport::{ServiceFuture, ServiceTransport};

// Re-export tower for transport-level layers
pub use tower;

// Re-export core types
pub use courier_core::{
    ByteStream, Decoder, Encoder, Error, JsonCodec, PayloadKind, Request, RequestBuilder,
    Response, ResponsePayload, Result, StreamingBody, StreamingResponse, StreamingTransport,
    Token, Transport, from_json,
};

// Re-export http types for methods, status codes and headers
pub use courier_core::{HeaderMap, Method, StatusCode, header};

pub use courier_core::time;
pub use url;
