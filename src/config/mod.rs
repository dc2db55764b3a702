//! Configuration types for the Syncthing client.

use crate::auth::{CredentialStore, Credentials, InMemoryCredentialStore};
use crate::errors::{SyncthingError, SyncthingResult};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Default Syncthing API base URL.
pub const DEFAULT_BASE_URL: &str = "https://localhost:8384/";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default User-Agent header.
pub const DEFAULT_USER_AGENT: &str = "syncthing-rest/0.1.0";

/// Connection pool configuration for the default transport.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum idle connections per host.
    pub max_idle_per_host: usize,
    /// Idle connection timeout.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_host: 20,
            idle_timeout: Duration::from_secs(90),
        }
    }
}

/// Syncthing client configuration.
#[derive(Clone)]
pub struct SyncthingConfig {
    /// API base URL.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// User-Agent header.
    pub user_agent: String,
    /// Connection pool configuration.
    pub pool: PoolConfig,
    /// Credential store supplying credentials per request. `None` means
    /// anonymous.
    pub credential_store: Option<Arc<dyn CredentialStore>>,
}

impl std::fmt::Debug for SyncthingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncthingConfig")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("user_agent", &self.user_agent)
            .field("pool", &self.pool)
            .field("credential_store", &self.credential_store.is_some())
            .finish()
    }
}

impl Default for SyncthingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pool: PoolConfig::default(),
            credential_store: None,
        }
    }
}

impl SyncthingConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> SyncthingConfigBuilder {
        SyncthingConfigBuilder::new()
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncthingResult<()> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            SyncthingError::configuration(format!(
                "the base address '{}' must be an absolute URI: {}",
                self.base_url, e
            ))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncthingError::configuration(
                "the base address must use http or https",
            ));
        }

        if self.timeout.is_zero() {
            return Err(SyncthingError::configuration(
                "the timeout must be greater than zero",
            ));
        }

        if self.user_agent.is_empty() {
            return Err(SyncthingError::configuration("the User-Agent is required"));
        }

        Ok(())
    }
}

/// Builder for [`SyncthingConfig`].
#[derive(Default)]
pub struct SyncthingConfigBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    pool: Option<PoolConfig>,
    credentials: Option<Credentials>,
    credential_store: Option<Arc<dyn CredentialStore>>,
}

impl SyncthingConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Sets the connection pool configuration.
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Sets fixed credentials. Mutually exclusive with
    /// [`credential_store`](Self::credential_store).
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets fixed API-key credentials.
    pub fn api_key(self, key: impl Into<String>) -> SyncthingResult<Self> {
        Ok(self.credentials(Credentials::api_key(key)?))
    }

    /// Sets a custom credential store. Mutually exclusive with
    /// [`credentials`](Self::credentials).
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.credential_store = Some(store);
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SyncthingResult<SyncthingConfig> {
        let credential_store = match (self.credentials, self.credential_store) {
            (Some(_), Some(_)) => {
                return Err(SyncthingError::configuration(
                    "credentials and a credential store are mutually exclusive",
                ));
            }
            (Some(credentials), None) => {
                Some(Arc::new(InMemoryCredentialStore::new(credentials)) as Arc<dyn CredentialStore>)
            }
            (None, store) => store,
        };

        let config = SyncthingConfig {
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            user_agent: self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            pool: self.pool.unwrap_or_default(),
            credential_store,
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncthingConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.credential_store.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = SyncthingConfig::builder()
            .base_url("http://127.0.0.1:8384")
            .user_agent("test-client/1.0")
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap();

        assert_eq!(config.base_url, "http://127.0.0.1:8384");
        assert_eq!(config.user_agent, "test-client/1.0");
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = SyncthingConfig::builder().base_url("not-a-url").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = SyncthingConfig::builder()
            .timeout(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_credentials_and_store_are_mutually_exclusive() {
        let result = SyncthingConfig::builder()
            .api_key("key")
            .unwrap()
            .credential_store(Arc::new(InMemoryCredentialStore::new(
                Credentials::anonymous(),
            )))
            .build();
        assert!(result.is_err());
    }
}
