//! Folder tree navigation
//!
//! Visited folders are materialized lazily as nodes in an identifier-keyed
//! arena; the cache tracks the current location and decides when a listing can
//! be served from memory.

pub mod cache;
pub mod node;

pub use cache::{ChannelListener, NavEvent, NavigationCache, NavigationListener};
pub use node::FolderNode;
