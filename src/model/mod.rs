//! Remote item model and its wire format.

pub mod entry;

pub use entry::{Entry, EntryKind, ListingPage};
