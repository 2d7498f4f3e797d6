//! Folder node representation

use crate::model::Entry;
use crate::types::ItemId;

/// One visited folder and its cached child listing
///
/// `cached_items` has three states: `None` (never fetched, or invalidated),
/// `Some(empty)` (fetched, folder has no children) and `Some(items)`.
#[derive(Debug, Clone)]
pub struct FolderNode {
    pub entry: Entry,
    /// Folder this node was first navigated into from; `None` for the root
    pub parent: Option<ItemId>,
    cached_items: Option<Vec<Entry>>,
}

impl FolderNode {
    pub fn new(entry: Entry, parent: Option<ItemId>) -> Self {
        Self {
            entry,
            parent,
            cached_items: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn is_cached(&self) -> bool {
        self.cached_items.is_some()
    }

    /// Replace the cached listing with a snapshot of `items`
    pub fn cache(&mut self, items: &[Entry]) {
        self.cached_items = Some(items.to_vec());
    }

    pub fn clear_cache(&mut self) {
        self.cached_items = None;
    }

    pub fn cached_items(&self) -> Option<&[Entry]> {
        self.cached_items.as_deref()
    }

    /// Whether the cached listing holds an item with this identifier
    pub fn lists(&self, item_id: &str) -> bool {
        self.cached_items
            .as_ref()
            .map(|items| items.iter().any(|e| e.id == item_id))
            .unwrap_or(false)
    }
}
