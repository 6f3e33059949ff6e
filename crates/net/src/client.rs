//! HTTP client with connection pooling
//!
//! One `NetClient` may be shared by any number of concurrent pipelines. It
//! never carries default authorization headers; every request supplies its own.

use lobup_config::Config;
use lobup_errors::{Error, NetworkError};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;

/// Network client configuration
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Default whole-request timeout; individual requests may override it
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_idle_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub user_agent: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(30),
            pool_idle_timeout: Duration::from_secs(90),
            pool_max_idle_per_host: 10,
            user_agent: format!("lobup/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl From<&Config> for NetConfig {
    fn from(config: &Config) -> Self {
        Self {
            timeout: config.registry.request_timeout(),
            connect_timeout: Duration::from_secs(config.network.connect_timeout_secs),
            pool_idle_timeout: Duration::from_secs(config.network.pool_idle_timeout_secs),
            pool_max_idle_per_host: config.network.pool_max_idle_per_host,
            user_agent: config.network.user_agent.clone(),
        }
    }
}

/// Shared HTTP client wrapper
#[derive(Clone, Debug)]
pub struct NetClient {
    client: Client,
    config: NetConfig,
}

impl NetClient {
    /// Create a new network client
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to initialize.
    pub fn new(config: NetConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| NetworkError::ClientInit(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create with default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created with default settings.
    pub fn with_defaults() -> Result<Self, Error> {
        Self::new(NetConfig::default())
    }

    /// Start a request with the default timeout applied
    #[must_use]
    pub fn request(&self, method: reqwest::Method, url: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .timeout(self.config.timeout)
    }

    /// Send a request, translating transport failures into `NetworkError`
    ///
    /// Non-success statuses are returned as responses; callers decide how to
    /// classify them.
    ///
    /// # Errors
    ///
    /// Returns an error for timeouts, connection failures, and other
    /// transport-level problems.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, Error> {
        request.send().await.map_err(|e| transport_error(&e).into())
    }

    #[must_use]
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// Get the underlying reqwest client for advanced usage
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }
}

/// Map a reqwest transport error onto the network error taxonomy
pub(crate) fn transport_error(error: &reqwest::Error) -> NetworkError {
    let url = error
        .url()
        .map(redact_query)
        .unwrap_or_default();
    if error.is_timeout() {
        NetworkError::Timeout { url }
    } else if error.is_connect() {
        NetworkError::ConnectionRefused(error.to_string())
    } else {
        NetworkError::RequestFailed(error.to_string())
    }
}

/// Drop the query string so signed URLs never reach logs or errors
pub(crate) fn redact_query(url: &url::Url) -> String {
    let mut url = url.clone();
    if url.query().is_some() {
        url.set_query(Some("REDACTED"));
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_query() {
        let url = url::Url::parse("https://acct.blob.test/c/b?sv=2020&sig=secret").unwrap();
        assert_eq!(redact_query(&url), "https://acct.blob.test/c/b?REDACTED");

        let url = url::Url::parse("https://graph.test/beta/apps").unwrap();
        assert_eq!(redact_query(&url), "https://graph.test/beta/apps");
    }

    #[test]
    fn test_config_from_app_config() {
        let mut config = Config::default();
        config.network.user_agent = "custom/1.0".into();
        config.registry.request_timeout_secs = 7;
        let net = NetConfig::from(&config);
        assert_eq!(net.user_agent, "custom/1.0");
        assert_eq!(net.timeout, Duration::from_secs(7));
    }
}
