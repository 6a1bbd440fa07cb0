//! cache_get tool implementation.
//!
//! Retrieves a raw cached value by key.

use memento_core::{CacheDb, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::json_result;

/// Parameters for the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetParams {
    /// The cache key to look up.
    pub key: String,
}

/// Output from the cache_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheGetOutput {
    pub key: String,
    /// The cached value as stored.
    pub value: Value,
}

/// Implementation of the cache_get tool.
pub async fn get_impl(cache: &CacheDb, params: CacheGetParams) -> Result<CallToolResult, McpError> {
    let value = cache
        .read(&params.key)
        .await?
        .ok_or_else(|| Error::NotFound(format!("cache key {}", params.key)))?;

    json_result(&CacheGetOutput { key: params.key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::decode;
    use memento_core::CacheValue;
    use memento_core::cache::compute_cache_key;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_impl_missing() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let params = CacheGetParams { key: "nonexistent".to_string() };

        let err = get_impl(&cache, params).await.unwrap_err();
        assert_eq!(err.code.0, -32001);
    }

    #[tokio::test]
    async fn test_get_impl_found() {
        let cache = CacheDb::open_in_memory().await.unwrap();
        let key = compute_cache_key("chat.txt_day_chunk_0", None);
        cache
            .write(&key, &CacheValue::Opaque(json!({"summary": "quiet day"})), None)
            .await
            .unwrap();

        let result = get_impl(&cache, CacheGetParams { key: key.clone() }).await.unwrap();
        let output: CacheGetOutput = decode(&result);
        assert_eq!(output.key, key);
        assert_eq!(output.value, json!({"summary": "quiet day"}));
    }
}
