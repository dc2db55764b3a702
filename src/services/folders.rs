//! Folder configuration operations.

use super::urls;
use crate::connection::Connection;
use crate::errors::{SyncthingError, SyncthingResult};
use crate::types::{Folder, NewFolder};

/// Service for the `rest/config/folders` endpoints.
pub struct FoldersService<'a> {
    connection: &'a Connection,
}

impl<'a> FoldersService<'a> {
    /// Creates a new folders service.
    pub fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    /// Lists all configured folders.
    pub async fn list(&self) -> SyncthingResult<Vec<Folder>> {
        Ok(self
            .connection
            .get::<Vec<Folder>>(urls::FOLDERS)
            .await?
            .into_body()
            .unwrap_or_default())
    }

    /// Gets the folder with the given ID.
    pub async fn get(&self, id: &str) -> SyncthingResult<Folder> {
        if id.is_empty() {
            return Err(SyncthingError::invalid_argument(
                "the folder id must not be empty",
            ));
        }

        self.connection
            .get::<Folder>(&urls::folder(id))
            .await?
            .into_body()
            .ok_or_else(|| SyncthingError::serialization("the response body was empty"))
    }

    /// Adds a new folder, or edits the folder if one with the same ID
    /// already exists.
    pub async fn create_or_edit(&self, folder: &NewFolder) -> SyncthingResult<()> {
        if folder.id.is_empty() {
            return Err(SyncthingError::invalid_argument(
                "the folder id must not be empty",
            ));
        }
        if folder.path.is_empty() {
            return Err(SyncthingError::invalid_argument(
                "the folder path must not be empty",
            ));
        }

        self.connection
            .post_unit(urls::FOLDERS, folder)
            .await?;
        Ok(())
    }
}
