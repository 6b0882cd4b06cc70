//! Transport configuration types.

use std::time::Duration;

/// Configuration for [`crate::HyperTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Time allowed for a response head to arrive.
    pub timeout: Duration,
    /// Connection timeout duration.
    pub connect_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_idle_per_host: usize,
    /// Idle connection timeout.
    pub pool_idle_timeout: Duration,
    /// Offer HTTP/2 during TLS negotiation.
    pub http2: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            http2: true,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    pool_idle_per_host: Option<usize>,
    pool_idle_timeout: Option<Duration>,
    http2: Option<bool>,
}

impl ClientConfigBuilder {
    /// Set the request timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    #[must_use]
    pub const fn pool_idle_per_host(mut self, count: usize) -> Self {
        self.pool_idle_per_host = Some(count);
        self
    }

    /// Set the idle connection timeout.
    #[must_use]
    pub const fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool_idle_timeout = Some(timeout);
        self
    }

    /// Enable or disable HTTP/2.
    #[must_use]
    pub const fn http2(mut self, enabled: bool) -> Self {
        self.http2 = Some(enabled);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ClientConfig {
        let defaults = ClientConfig::default();
        ClientConfig {
            timeout: self.timeout.unwrap_or(defaults.timeout),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            pool_idle_per_host: self
                .pool_idle_per_host
                .unwrap_or(defaults.pool_idle_per_host),
            pool_idle_timeout: self.pool_idle_timeout.unwrap_or(defaults.pool_idle_timeout),
            http2: self.http2.unwrap_or(defaults.http2),
        }
    }
}
