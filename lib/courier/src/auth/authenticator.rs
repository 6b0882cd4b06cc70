//! Single-flight token refresh.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use tracing::{debug, info, warn};

use super::RefreshPolicy;
use crate::middleware::{MiddlewareFuture, RequestMiddleware};
use crate::{Error, Request, Result, Token, Transport};

type SharedOutcome = Shared<BoxFuture<'static, std::result::Result<Token, Arc<Error>>>>;

/// The refresh currently in flight.
struct RefreshHandle {
    generation: u64,
    outcome: SharedOutcome,
}

#[derive(Default)]
struct InFlight {
    next_generation: u64,
    current: Option<RefreshHandle>,
}

type InFlightSlot = Arc<Mutex<InFlight>>;

fn lock(slot: &Mutex<InFlight>) -> std::sync::MutexGuard<'_, InFlight> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the handle of one refresh generation when dropped.
///
/// Lives inside the refresh task, so the slot is freed on completion, on
/// panic and on cancellation alike.
struct RefreshGuard {
    slot: InFlightSlot,
    generation: u64,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        let mut in_flight = lock(&self.slot);
        if in_flight
            .current
            .as_ref()
            .is_some_and(|handle| handle.generation == self.generation)
        {
            in_flight.current = None;
        }
    }
}

struct State<P, T> {
    policy: P,
    transport: T,
    in_flight: InFlightSlot,
}

impl<P, T> State<P, T>
where
    P: RefreshPolicy,
    T: Transport,
{
    async fn run_refresh(&self, current: Option<Token>) -> Result<Token> {
        let request = self.policy.construct_refresh_request(current.as_ref())?;
        debug!(method = %request.method(), url = %request.url(), "sending token refresh request");
        let response = self.transport.perform(request).await;
        self.policy.process_refresh_response(response).await
    }
}

/// Coordinates token refreshes so concurrent callers share a single one.
///
/// At most one refresh is in flight per authenticator. Every caller that
/// arrives while it runs awaits the same outcome: the same [`Token`], or an
/// [`Error::RefreshFailed`] around the same shared cause.
///
/// The refresh runs on its own tokio task: dropping a waiting future never
/// cancels it.
///
/// Install it as a request middleware to authenticate every request:
///
/// ```ignore
/// let authenticator = TokenAuthenticator::new(policy, HyperTransport::new());
/// session.request_middlewares().add(authenticator.clone());
/// ```
pub struct TokenAuthenticator<P, T> {
    state: Arc<State<P, T>>,
}

impl<P, T> Clone for TokenAuthenticator<P, T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<P, T> TokenAuthenticator<P, T>
where
    P: RefreshPolicy,
    T: Transport + 'static,
{
    /// Create an authenticator refreshing through `transport`.
    ///
    /// `transport` is only used for refresh requests.
    pub fn new(policy: P, transport: T) -> Self {
        Self {
            state: Arc::new(State {
                policy,
                transport,
                in_flight: InFlightSlot::default(),
            }),
        }
    }

    /// The refresh policy.
    #[must_use]
    pub fn policy(&self) -> &P {
        &self.state.policy
    }

    /// Returns `true` while a refresh is in flight.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        lock(&self.state.in_flight).current.is_some()
    }

    /// A token that is valid now, refreshing it when needed.
    ///
    /// Joins the in-flight refresh if there is one. Otherwise returns the
    /// cached token when it is still valid and `force_refresh` is `false`.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingToken`] when no token is cached and no refresh runs
    /// - [`Error::RefreshFailed`] when the refresh this call waited on failed
    pub async fn valid_token(&self, force_refresh: bool) -> Result<Token> {
        if let Some(outcome) = self.current_refresh() {
            debug!("joining in-flight token refresh");
            return Self::join(outcome).await;
        }

        let Some(current) = self.state.policy.access_token().await else {
            return Err(Error::MissingToken);
        };
        if current.is_valid() && !force_refresh {
            return Ok(current);
        }
        self.refresh_token(Some(current)).await
    }

    /// Refresh the token, or join the refresh already in flight.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RefreshFailed`] with the cause shared by every caller
    /// of the same refresh.
    pub async fn refresh_token(&self, current: Option<Token>) -> Result<Token> {
        let outcome = {
            let mut in_flight = lock(&self.state.in_flight);
            if let Some(handle) = &in_flight.current {
                debug!(generation = handle.generation, "joining in-flight token refresh");
                handle.outcome.clone()
            } else {
                let generation = in_flight.next_generation;
                in_flight.next_generation += 1;
                let outcome = self.start_refresh(generation, current);
                in_flight.current = Some(RefreshHandle {
                    generation,
                    outcome: outcome.clone(),
                });
                outcome
            }
        };
        Self::join(outcome).await
    }

    fn current_refresh(&self) -> Option<SharedOutcome> {
        lock(&self.state.in_flight)
            .current
            .as_ref()
            .map(|handle| handle.outcome.clone())
    }

    async fn join(outcome: SharedOutcome) -> Result<Token> {
        outcome.await.map_err(Error::RefreshFailed)
    }

    /// Build the shared outcome of a new refresh.
    ///
    /// The task is spawned on first poll, once the slot lock is released.
    fn start_refresh(&self, generation: u64, current: Option<Token>) -> SharedOutcome {
        let state = Arc::clone(&self.state);
        let guard = RefreshGuard {
            slot: Arc::clone(&self.state.in_flight),
            generation,
        };

        async move {
            info!(generation, "token refresh started");
            let task = tokio::spawn(async move {
                let outcome = state.run_refresh(current).await;
                drop(guard);
                match &outcome {
                    Ok(token) => info!(generation, expiry = %token.expiry(), "token refresh completed"),
                    Err(err) => warn!(generation, error = %err, "token refresh failed"),
                }
                outcome.map_err(Arc::new)
            });
            task.await.unwrap_or_else(|err| {
                Err(Arc::new(Error::cancelled(format!(
                    "token refresh did not complete: {err}"
                ))))
            })
        }
        .boxed()
        .shared()
    }
}

impl<P, T> RequestMiddleware for TokenAuthenticator<P, T>
where
    P: RefreshPolicy,
    T: Transport + 'static,
{
    fn handle<'a>(&'a self, request: &'a mut Request<Bytes>) -> MiddlewareFuture<'a, ()> {
        Box::pin(async move {
            let token = match self.valid_token(false).await {
                Ok(token) => token,
                Err(err) => {
                    return Err(match token_error(err) {
                        Ok(token_err) => self.state.policy.on_token_error(token_err).await,
                        Err(other) => other,
                    });
                }
            };
            request.set_header("Authorization", &token.bearer())
        })
    }

    fn name(&self) -> &'static str {
        "token_authenticator"
    }
}

/// The missing or expired token error behind `err`, if any.
///
/// Looks through a shared refresh failure, where the policy reported the
/// token itself as unusable.
fn token_error(err: Error) -> std::result::Result<Error, Error> {
    match err {
        Error::MissingToken | Error::ExpiredToken => Ok(err),
        Error::RefreshFailed(cause) if matches!(*cause, Error::MissingToken) => {
            Ok(Error::MissingToken)
        }
        Error::RefreshFailed(cause) if matches!(*cause, Error::ExpiredToken) => {
            Ok(Error::ExpiredToken)
        }
        other => Err(other),
    }
}

impl<P, T> fmt::Debug for TokenAuthenticator<P, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let refreshing = lock(&self.state.in_flight).current.is_some();
        f.debug_struct("TokenAuthenticator")
            .field("refreshing", &refreshing)
            .finish_non_exhaustive()
    }
}
