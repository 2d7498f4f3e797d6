//! Drivenav: Remote Drive Navigation
//!
//! Browses a remote hierarchical file store over its REST API. Visited folders
//! are kept in a lazily-materialized, in-memory navigation cache that serves
//! listings instantly when it can and falls back to the network when it cannot.

pub mod config;
pub mod download;
pub mod error;
pub mod logging;
pub mod model;
pub mod remote;
pub mod session;
pub mod tooling;
pub mod tree;
pub mod types;

#[cfg(test)]
mod test_support;
