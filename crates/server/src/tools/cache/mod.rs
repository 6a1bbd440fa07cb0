//! Raw cache MCP tools.
//!
//! Read-only access to cached payloads and the provenance index.

pub mod get;
pub mod indexed_keys;

pub use get::{CacheGetParams, get_impl};
pub use indexed_keys::{CacheIndexedKeysParams, indexed_keys_impl};
