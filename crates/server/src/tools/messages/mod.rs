//! Message MCP tools.

pub mod delete;

pub use delete::{MessagesDeleteParams, delete_impl};
