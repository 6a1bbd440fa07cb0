//! messages_delete tool implementation.
//!
//! Deletes messages by id; owning exchanges are kept even when emptied.

use memento_core::CacheDb;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the messages_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessagesDeleteParams {
    pub message_ids: Vec<i64>,
}

/// Output from the messages_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessagesDeleteOutput {
    /// Number of messages actually removed; unknown ids are not counted.
    pub deleted_count: u64,
}

/// Implementation of the messages_delete tool.
pub async fn delete_impl(cache: &CacheDb, params: MessagesDeleteParams) -> Result<CallToolResult, McpError> {
    if params.message_ids.is_empty() {
        return Err(ToolError::InvalidInput("message_ids must not be empty".into()).into());
    }

    let deleted_count = cache.delete_messages(&params.message_ids).await?;
    json_result(&MessagesDeleteOutput { deleted_count })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::decode;
    use crate::tools::exchanges::fixtures::seeded;

    #[tokio::test]
    async fn test_delete_counts_existing_only() {
        let (cache, ids) = seeded().await;
        let detail = cache.get_exchange(ids[2]).await.unwrap().unwrap();
        let mut message_ids: Vec<i64> = detail.messages.iter().map(|m| m.message_id).collect();
        message_ids.push(9_999);

        let result = delete_impl(&cache, MessagesDeleteParams { message_ids }).await.unwrap();
        let output: MessagesDeleteOutput = decode(&result);
        assert_eq!(output.deleted_count, 2);

        let emptied = cache.get_exchange(ids[2]).await.unwrap().unwrap();
        assert!(emptied.messages.is_empty());
    }

    #[tokio::test]
    async fn test_delete_rejects_empty_list() {
        let (cache, _) = seeded().await;

        let err = delete_impl(&cache, MessagesDeleteParams { message_ids: vec![] }).await.unwrap_err();
        assert_eq!(err.code.0, -32602);
    }
}
