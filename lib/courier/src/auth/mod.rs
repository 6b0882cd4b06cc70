//! OAuth2-style token refresh.
//!
//! [`TokenAuthenticator`] keeps at most one refresh in flight and shares its
//! outcome with every concurrent caller. Where tokens come from and how they
//! are refreshed is up to a [`RefreshPolicy`].

mod authenticator;
mod policy;

pub use authenticator::TokenAuthenticator;
pub use policy::RefreshPolicy;
