//! Drive session: mutations, refresh routing and downloads
//!
//! Mutations go straight to the remote client. On success the folder whose
//! listing they changed is refreshed when it is the current folder, and
//! invalidated otherwise so its next visit re-fetches.

use crate::download::Downloader;
use crate::error::DriveError;
use crate::model::Entry;
use crate::remote::RemoteListing;
use crate::tree::NavigationCache;
use crate::types::ItemId;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub struct DriveSession {
    client: Arc<dyn RemoteListing>,
    cache: NavigationCache,
    downloader: Downloader,
}

impl DriveSession {
    pub fn new(client: Arc<dyn RemoteListing>, cache: NavigationCache, downloader: Downloader) -> Self {
        Self {
            client,
            cache,
            downloader,
        }
    }

    pub fn cache(&self) -> &NavigationCache {
        &self.cache
    }

    pub fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    /// Create a folder inside the current folder
    pub async fn create_folder(&self, name: &str) -> Result<Entry, DriveError> {
        let name = validate_name(name)?;
        let parent = self.cache.current_id();
        let created = self.client.create_folder(&parent, name).await?;
        info!(parent_id = %parent, name = %name, "Folder created");
        self.refresh_affected(&parent);
        Ok(created)
    }

    pub async fn rename(&self, entry: &Entry, new_name: &str) -> Result<Entry, DriveError> {
        let new_name = validate_name(new_name)?;
        let owner = self.owning_folder(entry);
        let renamed = self.client.rename_item(&entry.id, new_name).await?;
        info!(item_id = %entry.id, from = %entry.name, to = %new_name, "Item renamed");
        self.refresh_affected(&owner);
        Ok(renamed)
    }

    pub async fn delete(&self, entry: &Entry) -> Result<(), DriveError> {
        let owner = self.owning_folder(entry);
        self.client.delete_item(&entry.id).await?;
        info!(item_id = %entry.id, name = %entry.name, "Item deleted");
        self.refresh_affected(&owner);
        Ok(())
    }

    pub async fn download(&self, entry: &Entry) -> Result<PathBuf, DriveError> {
        self.downloader.download(entry).await
    }

    /// Folder whose listing changes when `entry` is renamed or deleted:
    /// the visited folder listing it, else the current folder
    pub fn owning_folder(&self, entry: &Entry) -> ItemId {
        self.cache
            .owner_of(&entry.id)
            .unwrap_or_else(|| self.cache.current_id())
    }

    /// Returns true if the current folder was refreshed
    fn refresh_affected(&self, folder_id: &str) -> bool {
        if self.cache.current_id() == folder_id {
            self.cache.refresh();
            return true;
        }
        debug!(item_id = %folder_id, "Invalidating listing of a folder other than the current one");
        self.cache.invalidate(folder_id);
        false
    }
}

/// Trimmed item name, rejecting empty names and path separators
pub fn validate_name(name: &str) -> Result<&str, DriveError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DriveError::InvalidOperation(
            "Name cannot be empty".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(DriveError::InvalidOperation(format!(
            "Name cannot contain path separators: {}",
            name
        )));
    }
    Ok(name)
}
