//! Bearer tokens.

use std::fmt;

use time::OffsetDateTime;

/// A bearer credential with an absolute expiry.
///
/// Tokens are plain values: whoever obtains one owns it, and may persist it
/// (it round-trips through serde with an RFC 3339 expiry).
///
/// Validity is an exact comparison against the current time. There is no
/// clock-skew margin, so a token may still be rejected by a server whose clock
/// runs ahead.
#[derive(Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Token {
    value: String,
    #[serde(with = "time::serde::rfc3339")]
    expiry: OffsetDateTime,
}

impl Token {
    /// Create a token from its credential and expiry instant.
    #[must_use]
    pub fn new(value: impl Into<String>, expiry: OffsetDateTime) -> Self {
        Self {
            value: value.into(),
            expiry,
        }
    }

    /// The raw credential.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Instant after which the token is no longer valid.
    #[must_use]
    pub const fn expiry(&self) -> OffsetDateTime {
        self.expiry
    }

    /// `true` while the expiry lies strictly in the future.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(OffsetDateTime::now_utc())
    }

    /// `true` if the expiry lies strictly after `now`.
    #[must_use]
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        self.expiry > now
    }

    /// `Authorization` header value for this token.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expiry", &self.expiry)
            .finish()
    }
}
