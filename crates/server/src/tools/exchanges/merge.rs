//! exchanges_merge tool implementation.
//!
//! Merges exchanges into the lowest id and re-indexes its messages by time.

use memento_core::CacheDb;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the exchanges_merge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExchangesMergeParams {
    /// At least two exchange ids; the lowest becomes the merge target.
    pub exchange_ids: Vec<i64>,
}

/// Output from the exchanges_merge tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExchangesMergeOutput {
    pub target_exchange_id: i64,
}

/// Implementation of the exchanges_merge tool.
pub async fn merge_impl(cache: &CacheDb, params: ExchangesMergeParams) -> Result<CallToolResult, McpError> {
    if params.exchange_ids.len() < 2 {
        return Err(ToolError::InvalidInput("exchange_ids must contain at least two ids".into()).into());
    }

    let target_exchange_id = cache.merge_exchanges(&params.exchange_ids).await?;
    json_result(&ExchangesMergeOutput { target_exchange_id })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::decode;
    use crate::tools::exchanges::fixtures::seeded;

    #[tokio::test]
    async fn test_merge_into_lowest_id() {
        let (cache, ids) = seeded().await;
        let params = ExchangesMergeParams { exchange_ids: vec![ids[2], ids[0], ids[1]] };

        let result = merge_impl(&cache, params).await.unwrap();
        let output: ExchangesMergeOutput = decode(&result);
        assert_eq!(output.target_exchange_id, ids[0]);

        let detail = cache.get_exchange(ids[0]).await.unwrap().unwrap();
        let times: Vec<_> = detail.messages.iter().filter_map(|m| m.time.as_deref()).collect();
        assert_eq!(times, vec!["08:00:00", "09:00:00", "10:00:00"]);
    }

    #[tokio::test]
    async fn test_merge_argument_errors() {
        let (cache, ids) = seeded().await;

        let single = merge_impl(&cache, ExchangesMergeParams { exchange_ids: vec![ids[0]] }).await;
        assert_eq!(single.unwrap_err().code.0, -32602);

        let unknown = merge_impl(&cache, ExchangesMergeParams { exchange_ids: vec![ids[0], 99_999] }).await;
        assert_eq!(unknown.unwrap_err().code.0, -32001);
        assert!(cache.get_exchange(ids[1]).await.unwrap().is_some());
    }
}
