//! Redis connection management.

use std::time::Duration;

use redis::aio::{ConnectionManager, MultiplexedConnection};
use redis::{AsyncConnectionConfig, Client};

use crate::error::{Error, Result};

/// Default Redis URL when none is configured.
pub const DEFAULT_URL: &str = "redis://localhost:6379";

/// Environment variable read by [`ConnectionConfig::from_env`].
pub const URL_ENV_VAR: &str = "REDIS_URL";

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Redis connection URL.
    pub url: String,
    /// Time allowed to establish a connection.
    pub connection_timeout: Option<Duration>,
    /// Time allowed for a reply to arrive.
    pub response_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            connection_timeout: Some(Duration::from_secs(5)),
            response_timeout: None,
        }
    }
}

impl ConnectionConfig {
    /// Create a config for the given URL with default timeouts.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Create a config from `REDIS_URL`, falling back to [`DEFAULT_URL`].
    pub fn from_env() -> Self {
        match std::env::var(URL_ENV_VAR) {
            Ok(url) if !url.trim().is_empty() => Self::new(url),
            _ => Self::default(),
        }
    }

    /// Set the connection timeout.
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = Some(timeout);
        self
    }

    /// Set the response timeout.
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    fn async_config(&self) -> AsyncConnectionConfig {
        let mut config = AsyncConnectionConfig::new();
        if let Some(timeout) = self.connection_timeout {
            config = config.set_connection_timeout(timeout);
        }
        if let Some(timeout) = self.response_timeout {
            config = config.set_response_timeout(timeout);
        }
        config
    }
}

/// Redis connection wrapper that manages connection lifecycle.
pub struct RedisConnection {
    client: Client,
    config: ConnectionConfig,
}

impl RedisConnection {
    /// Create a new Redis connection from a URL.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., "redis://localhost:6379")
    ///
    /// # Examples
    /// ```ignore
    /// let conn = RedisConnection::new("redis://localhost:6379")?;
    /// ```
    pub fn new(url: &str) -> Result<Self> {
        Self::with_config(ConnectionConfig::new(url))
    }

    /// Create a new Redis connection from a config.
    pub fn with_config(config: ConnectionConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.url, e)))?;
        Ok(Self { client, config })
    }

    /// The config this connection was created with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Get an async multiplexed connection.
    pub async fn get_async_connection(&self) -> Result<MultiplexedConnection> {
        tracing::debug!(url = %self.config.url, "opening multiplexed connection");
        self.client
            .get_multiplexed_async_connection_with_config(&self.config.async_config())
            .await
            .map_err(Error::Connection)
    }

    /// Get a ConnectionManager for async operations with auto-reconnection.
    ///
    /// ConnectionManager is cheap to clone and provides automatic reconnection
    /// on connection failures.
    pub async fn get_connection_manager(&self) -> Result<ConnectionManager> {
        ConnectionManager::new(self.client.clone())
            .await
            .map_err(Error::Connection)
    }

    /// Get an async Redis Cluster connection seeded from this URL.
    #[cfg(feature = "cluster")]
    pub async fn get_cluster_connection(&self) -> Result<redis::cluster_async::ClusterConnection> {
        let client = redis::cluster::ClusterClient::new(vec![self.config.url.as_str()])
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", self.config.url, e)))?;
        client.get_async_connection().await.map_err(Error::Connection)
    }
}
