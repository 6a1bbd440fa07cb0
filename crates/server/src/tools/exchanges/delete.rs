//! exchange_delete tool implementation.

use memento_core::CacheDb;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ToolError;
use crate::tools::json_result;

/// Parameters for the exchange_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExchangeDeleteParams {
    pub exchange_id: i64,
}

/// Output from the exchange_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExchangeDeleteOutput {
    pub deleted_exchange_id: i64,
}

/// Implementation of the exchange_delete tool.
///
/// Deleting an exchange also deletes its messages.
pub async fn delete_impl(cache: &CacheDb, params: ExchangeDeleteParams) -> Result<CallToolResult, McpError> {
    if !cache.delete_exchange(params.exchange_id).await? {
        return Err(ToolError::NotFound(format!("exchange {} not found or not deleted", params.exchange_id)).into());
    }

    json_result(&ExchangeDeleteOutput { deleted_exchange_id: params.exchange_id })
}
