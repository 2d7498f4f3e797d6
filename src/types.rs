//! Core types shared across the navigation cache and the remote client.

/// ItemId: identifier of a remote item, unique and stable within the store
pub type ItemId = String;

/// Ticket: sequence number tagging one outstanding listing fetch
pub type Ticket = u64;

/// Reserved identifier of the synthetic root folder.
///
/// Listing this identifier asks the store for its top-level entries rather
/// than the children of an item literally named "root".
pub const ROOT_ID: &str = "root";
