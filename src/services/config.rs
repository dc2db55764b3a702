//! Configuration operations.

use super::urls;
use crate::connection::Connection;
use crate::errors::{SyncthingError, SyncthingResult};
use crate::types::Config;

/// Service for the `rest/config` endpoint.
pub struct ConfigService<'a> {
    connection: &'a Connection,
}

impl<'a> ConfigService<'a> {
    /// Creates a new config service.
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    /// Gets the entire configuration.
    pub async fn get(&self) -> SyncthingResult<Config> {
        self.connection
            .get::<Config>(urls::CONFIG)
            .await?
            .into_body()
            .ok_or_else(|| SyncthingError::serialization("the response body was empty"))
    }
}
