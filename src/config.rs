//! Proxy configuration
//!
//! Settings can be built in code or read from `ORACLE_PROXY_*`
//! environment variables.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default port the proxy listens on
pub const DEFAULT_LISTEN_PORT: u16 = 1521;

/// Default size of one transport read
pub const DEFAULT_READ_CHUNK: usize = 8192;

/// Default timeout for connecting to the upstream server
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable for the listen address
pub const ENV_LISTEN: &str = "ORACLE_PROXY_LISTEN";
/// Environment variable for the upstream address
pub const ENV_UPSTREAM: &str = "ORACLE_PROXY_UPSTREAM";
/// Environment variable for the read size
pub const ENV_READ_CHUNK: &str = "ORACLE_PROXY_READ_CHUNK";
/// Environment variable for the connect timeout in milliseconds
pub const ENV_CONNECT_TIMEOUT_MS: &str = "ORACLE_PROXY_CONNECT_TIMEOUT_MS";

/// Configuration of a recording proxy.
///
/// # Examples
///
/// ```rust
/// use oracle_proxy::ProxyConfig;
/// use std::time::Duration;
///
/// let config = ProxyConfig::new("db.internal:1521")
///     .with_listen("127.0.0.1:15210")
///     .with_connect_timeout(Duration::from_secs(3))
///     .with_retain_records(false);
/// assert_eq!(config.upstream, "db.internal:1521");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Address the proxy accepts clients on
    pub listen: String,
    /// Database server the proxy forwards to
    pub upstream: String,
    /// Bytes requested per transport read
    pub read_chunk: usize,
    /// Timeout for connecting to the upstream server
    pub connect_timeout: Duration,
    /// Keep recorded exchanges in memory
    pub retain_records: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: format!("0.0.0.0:{}", DEFAULT_LISTEN_PORT),
            upstream: format!("127.0.0.1:{}", DEFAULT_LISTEN_PORT),
            read_chunk: DEFAULT_READ_CHUNK,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retain_records: true,
        }
    }
}

impl ProxyConfig {
    /// Configuration forwarding to `upstream`, defaults otherwise
    pub fn new(upstream: impl Into<String>) -> Self {
        Self {
            upstream: upstream.into(),
            ..Default::default()
        }
    }

    /// Set the listen address
    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }

    /// Set the upstream address
    pub fn with_upstream(mut self, upstream: impl Into<String>) -> Self {
        self.upstream = upstream.into();
        self
    }

    /// Set the transport read size
    pub fn with_read_chunk(mut self, read_chunk: usize) -> Self {
        self.read_chunk = read_chunk;
        self
    }

    /// Set the upstream connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Keep or drop recorded exchanges
    pub fn with_retain_records(mut self, retain: bool) -> Self {
        self.retain_records = retain;
        self
    }

    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(listen) = lookup(ENV_LISTEN) {
            config.listen = non_empty(ENV_LISTEN, listen)?;
        }
        if let Some(upstream) = lookup(ENV_UPSTREAM) {
            config.upstream = non_empty(ENV_UPSTREAM, upstream)?;
        }
        if let Some(raw) = lookup(ENV_READ_CHUNK) {
            config.read_chunk = match raw.trim().parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => return Err(invalid(ENV_READ_CHUNK, &raw)),
            };
        }
        if let Some(raw) = lookup(ENV_CONNECT_TIMEOUT_MS) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid(ENV_CONNECT_TIMEOUT_MS, &raw))?;
            config.connect_timeout = Duration::from_millis(millis);
        }
        Ok(config)
    }
}

fn non_empty(key: &str, value: String) -> Result<String> {
    if value.trim().is_empty() {
        return Err(invalid(key, &value));
    }
    Ok(value.trim().to_string())
}

fn invalid(key: &str, value: &str) -> Error {
    Error::Config(format!("{}: invalid value {:?}", key, value))
}
