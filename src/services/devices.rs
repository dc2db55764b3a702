//! Device configuration operations.

use super::urls;
use crate::connection::Connection;
use crate::errors::{SyncthingError, SyncthingResult};
use crate::types::Device;

/// Service for the `rest/config/devices` endpoints.
pub struct DevicesService<'a> {
    connection: &'a Connection,
}

impl<'a> DevicesService<'a> {
    /// Creates a new devices service.
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    /// Lists all known devices.
    pub async fn list(&self) -> SyncthingResult<Vec<Device>> {
        Ok(self
            .connection
            .get::<Vec<Device>>(urls::DEVICES)
            .await?
            .into_body()
            .unwrap_or_default())
    }

    /// Gets the device with the given ID.
    pub async fn get(&self, id: &str) -> SyncthingResult<Device> {
        if id.is_empty() {
            return Err(SyncthingError::invalid_argument(
                "the device id must not be empty",
            ));
        }

        self.connection
            .get::<Device>(&urls::device(id))
            .await?
            .into_body()
            .ok_or_else(|| SyncthingError::serialization("the response body was empty"))
    }
}
