//! Adapter configuration.
//!
//! An immutable value handed to [`Adapter::new`](crate::Adapter::new);
//! multiple independently configured adapters can coexist.

use std::time::Duration;

/// Adapter configuration.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Prefix prepended to every relative path.
    pub base_path: String,
    /// Default headers for all requests; per-call overrides win key by key.
    pub default_headers: Vec<(String, String)>,
    /// Default credentials mode. When true the underlying client keeps a
    /// cookie store across requests.
    pub with_credentials: bool,
    /// Default request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Connection pool idle timeout.
    pub pool_idle_timeout: Duration,
    /// Maximum idle connections per host.
    pub pool_max_idle_per_host: usize,
    /// User agent string.
    pub user_agent: String,
    /// Enable gzip compression.
    pub gzip: bool,
    /// Enable brotli compression.
    pub brotli: bool,
    /// Follow redirects.
    pub follow_redirects: bool,
    /// Maximum redirects to follow.
    pub max_redirects: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            base_path: String::new(),
            default_headers: Vec::new(),
            with_credentials: false,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 32,
            user_agent: format!("restwire/{}", env!("CARGO_PKG_VERSION")),
            gzip: true,
            brotli: true,
            follow_redirects: true,
            max_redirects: 10,
        }
    }
}

impl AdapterConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AdapterConfigBuilder {
        AdapterConfigBuilder::default()
    }
}

/// Builder for adapter configuration.
#[derive(Debug, Default)]
pub struct AdapterConfigBuilder {
    config: AdapterConfig,
}

impl AdapterConfigBuilder {
    /// Set the path prefix prepended to every relative path.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.config.base_path = base_path.into();
        self
    }

    /// Add a default header for all requests.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config
            .default_headers
            .push((name.into(), value.into()));
        self
    }

    /// Set the default credentials mode.
    pub fn with_credentials(mut self, enable: bool) -> Self {
        self.config.with_credentials = enable;
        self
    }

    /// Set the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the connection pool idle timeout.
    pub fn pool_idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.pool_idle_timeout = timeout;
        self
    }

    /// Set the maximum idle connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.config.pool_max_idle_per_host = max;
        self
    }

    /// Set the user agent string.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Enable or disable gzip compression.
    pub fn gzip(mut self, enable: bool) -> Self {
        self.config.gzip = enable;
        self
    }

    /// Enable or disable brotli compression.
    pub fn brotli(mut self, enable: bool) -> Self {
        self.config.brotli = enable;
        self
    }

    /// Enable or disable following redirects.
    pub fn follow_redirects(mut self, enable: bool) -> Self {
        self.config.follow_redirects = enable;
        self
    }

    /// Set the maximum number of redirects to follow.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> AdapterConfig {
        self.config
    }
}
