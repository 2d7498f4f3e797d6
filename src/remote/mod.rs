//! Remote listing client
//!
//! The navigation cache and the session talk to the store only through
//! [`RemoteListing`]; the concrete client is constructed by the caller and
//! passed in.

pub mod graph;
pub mod token;

use crate::error::DriveError;
use crate::model::Entry;
use async_trait::async_trait;

pub use graph::GraphClient;
pub use token::{StaticToken, TokenServer, TokenSource};

/// Listing and mutation operations against the remote store
#[async_trait]
pub trait RemoteListing: Send + Sync {
    /// Top-level entries of the store
    async fn list_root(&self) -> Result<Vec<Entry>, DriveError>;

    /// Ordered children of the folder `item_id`
    async fn list_children(&self, item_id: &str) -> Result<Vec<Entry>, DriveError>;

    async fn delete_item(&self, item_id: &str) -> Result<(), DriveError>;

    async fn create_folder(&self, parent_id: &str, name: &str) -> Result<Entry, DriveError>;

    async fn rename_item(&self, item_id: &str, new_name: &str) -> Result<Entry, DriveError>;
}
