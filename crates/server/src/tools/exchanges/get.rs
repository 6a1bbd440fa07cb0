//! exchange_get tool implementation.

use memento_core::{CacheDb, Error};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the exchange_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExchangeGetParams {
    pub exchange_id: i64,
}

/// Implementation of the exchange_get tool.
pub async fn get_impl(cache: &CacheDb, params: ExchangeGetParams) -> Result<CallToolResult, McpError> {
    let detail = cache
        .get_exchange(params.exchange_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("exchange {}", params.exchange_id)))?;

    json_result(&detail)
}
