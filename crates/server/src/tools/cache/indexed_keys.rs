//! cache_indexed_keys tool implementation.
//!
//! Lists cache keys written by the primary extraction pass.

use memento_core::CacheDb;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the cache_indexed_keys tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CacheIndexedKeysParams {}

/// Output from the cache_indexed_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheIndexedKeysOutput {
    pub keys: Vec<String>,
}

/// Implementation of the cache_indexed_keys tool.
pub async fn indexed_keys_impl(cache: &CacheDb, _params: CacheIndexedKeysParams) -> Result<CallToolResult, McpError> {
    let keys = cache.indexed_keys().await;
    json_result(&CacheIndexedKeysOutput { keys })
}
