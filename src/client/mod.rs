//! Top-level Syncthing API client.

use crate::auth::{CredentialStore, Credentials, InMemoryCredentialStore};
use crate::config::{SyncthingConfig, SyncthingConfigBuilder};
use crate::connection::Connection;
use crate::errors::{SyncthingError, SyncthingResult};
use crate::http::{HttpTransport, ReqwestTransport};
use crate::services::{ConfigService, DevicesService, FoldersService};
use std::sync::Arc;
use url::Url;

/// Syncthing API client.
pub struct SyncthingClient {
    connection: Connection,
}

impl SyncthingClient {
    /// Creates a new client with the default reqwest-backed transport.
    pub fn new(config: SyncthingConfig) -> SyncthingResult<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool.max_idle_per_host)
            .pool_idle_timeout(config.pool.idle_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                SyncthingError::configuration(format!("failed to create HTTP client: {}", e))
            })?;

        Self::with_transport(config, Arc::new(ReqwestTransport::new(http)))
    }

    /// Creates a new client with an injected transport.
    pub fn with_transport(
        config: SyncthingConfig,
        transport: Arc<dyn HttpTransport>,
    ) -> SyncthingResult<Self> {
        config.validate()?;

        let base_address = Url::parse(&config.base_url).map_err(|e| {
            SyncthingError::configuration(format!("invalid base URL '{}': {}", config.base_url, e))
        })?;

        let credential_store = config.credential_store.unwrap_or_else(|| {
            Arc::new(InMemoryCredentialStore::new(Credentials::anonymous()))
        });

        let connection =
            Connection::with_credential_store(base_address, credential_store, transport)?;

        Ok(Self { connection })
    }

    /// Creates a new client builder.
    pub fn builder() -> SyncthingClientBuilder {
        SyncthingClientBuilder::new()
    }

    /// Gets the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Replaces the connection's credentials with a fixed value.
    pub fn set_credentials(&self, credentials: Credentials) {
        self.connection.set_credentials(credentials);
    }

    // Service accessors

    /// Gets the config service.
    pub fn config(&self) -> ConfigService<'_> {
        ConfigService::new(&self.connection)
    }

    /// Gets the folders service.
    pub fn folders(&self) -> FoldersService<'_> {
        FoldersService::new(&self.connection)
    }

    /// Gets the devices service.
    pub fn devices(&self) -> DevicesService<'_> {
        DevicesService::new(&self.connection)
    }
}

/// Builder for [`SyncthingClient`].
pub struct SyncthingClientBuilder {
    config_builder: SyncthingConfigBuilder,
}

impl SyncthingClientBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            config_builder: SyncthingConfig::builder(),
        }
    }

    /// Sets the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.base_url(url);
        self
    }

    /// Sets fixed API-key credentials.
    pub fn api_key(mut self, key: impl Into<String>) -> SyncthingResult<Self> {
        self.config_builder = self.config_builder.api_key(key)?;
        Ok(self)
    }

    /// Sets a custom credential store.
    pub fn credential_store(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.config_builder = self.config_builder.credential_store(store);
        self
    }

    /// Sets the request timeout.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config_builder = self.config_builder.timeout(timeout);
        self
    }

    /// Sets the User-Agent header.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config_builder = self.config_builder.user_agent(ua);
        self
    }

    /// Builds the client.
    pub fn build(self) -> SyncthingResult<SyncthingClient> {
        let config = self.config_builder.build()?;
        SyncthingClient::new(config)
    }
}

impl Default for SyncthingClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockResponse, MockTransport};
    use crate::types::Config;

    #[test]
    fn test_client_builder() {
        let result = SyncthingClient::builder()
            .base_url("http://127.0.0.1:8384")
            .api_key("abc123")
            .unwrap()
            .user_agent("test-client/1.0")
            .build();

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_config_service_over_mock_transport() {
        let transport = MockTransport::new();
        transport.enqueue(
            "GET",
            "rest/config",
            MockResponse::ok(&Config {
                version: 37,
                folders: Vec::new(),
            }),
        );

        let client = SyncthingClient::with_transport(
            SyncthingConfig::default(),
            Arc::new(transport.clone()),
        )
        .unwrap();

        let config = client.config().get().await.unwrap();
        assert_eq!(config.version, 37);
        assert_eq!(transport.requests().len(), 1);
    }
}
