//! Pluggable refresh behavior for [`super::TokenAuthenticator`].

use std::future::Future;

use bytes::Bytes;

use crate::{Error, Request, Response, Result, Token};

/// Where tokens come from and how they are refreshed.
///
/// The authenticator owns the single-flight coordination; a policy only knows
/// the credential store and the token endpoint.
///
/// # Example
///
/// ```ignore
/// use courier::{Error, RefreshPolicy, Request, Response, Result, Token};
///
/// struct ClientCredentials {
///     store: TokenStore,
///     token_url: url::Url,
/// }
///
/// impl RefreshPolicy for ClientCredentials {
///     async fn access_token(&self) -> Option<Token> {
///         self.store.load().await
///     }
///
///     fn construct_refresh_request(&self, _current: Option<&Token>) -> Result<Request> {
///         Request::builder(courier::Method::POST, self.token_url.clone())
///             .header("Content-Type", "application/x-www-form-urlencoded")
///             .body("grant_type=client_credentials".into())
///             .build()
///     }
///
///     async fn process_refresh_response(&self, response: Result<Response>) -> Result<Token> {
///         let token: Token = response?.json()?;
///         self.store.save(&token).await;
///         Ok(token)
///     }
/// }
/// ```
pub trait RefreshPolicy: Send + Sync + 'static {
    /// The locally cached token, if any.
    fn access_token(&self) -> impl Future<Output = Option<Token>> + Send;

    /// Build the request that fetches a new token.
    ///
    /// `current` is the token being replaced, when one is known.
    ///
    /// # Errors
    ///
    /// A failure here is the outcome of the refresh.
    fn construct_refresh_request(&self, current: Option<&Token>) -> Result<Request<Bytes>>;

    /// Turn the outcome of the refresh request into a token.
    ///
    /// Called exactly once per refresh, with the transport failure when the
    /// request could not be performed.
    ///
    /// # Errors
    ///
    /// A failure here is the outcome of the refresh.
    fn process_refresh_response(
        &self,
        response: Result<Response<Bytes>>,
    ) -> impl Future<Output = Result<Token>> + Send;

    /// Replace a missing or expired token error before it fails a request.
    ///
    /// Also called when the refresh itself reports a missing or expired
    /// token, e.g. a revoked refresh token. May await side effects such as
    /// prompting for a new login.
    fn on_token_error(&self, error: Error) -> impl Future<Output = Error> + Send {
        async { error }
    }
}
