//! MCP tool implementations.
//!
//! This module contains all tools exposed by the memento server. Each tool
//! has an `*_impl` function taking the cache handle and its parameters, so
//! it can be exercised without a transport.

pub mod cache;
pub mod exchanges;
pub mod messages;

use memento_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Render a tool output as pretty-printed JSON text content.
pub(crate) fn json_result<T: Serialize + ?Sized>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output).map_err(Error::from)?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn decode<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
