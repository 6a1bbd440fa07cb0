//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use crate::tools::cache::{self as cache_tools, CacheGetParams, CacheIndexedKeysParams};
use crate::tools::exchanges::{self, ExchangeDeleteParams, ExchangeGetParams, ExchangesListParams, ExchangesMergeParams};
use crate::tools::messages::{self, MessagesDeleteParams};

use memento_core::CacheDb;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The main MCP server handler for memento.
#[derive(Clone)]
pub struct MementoServer {
    db: CacheDb,
    default_page_size: u32,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl MementoServer {
    /// Create a new server handler over an opened cache.
    pub fn new(db: CacheDb, default_page_size: u32) -> Self {
        Self { db, default_page_size, tool_router: Self::tool_router() }
    }

    #[tool(
        description = "List extracted exchanges, one page at a time, with each exchange's first message as a preview. Sort by first message time: asc (default), desc, or none."
    )]
    async fn exchanges_list(&self, params: Parameters<ExchangesListParams>) -> Result<CallToolResult, McpError> {
        exchanges::list_impl(&self.db, self.default_page_size, params.0).await
    }

    #[tool(description = "Get one exchange with all of its messages in stored order.")]
    async fn exchange_get(&self, params: Parameters<ExchangeGetParams>) -> Result<CallToolResult, McpError> {
        exchanges::get_impl(&self.db, params.0).await
    }

    #[tool(description = "Delete an exchange and all of its messages.")]
    async fn exchange_delete(&self, params: Parameters<ExchangeDeleteParams>) -> Result<CallToolResult, McpError> {
        exchanges::delete_impl(&self.db, params.0).await
    }

    #[tool(description = "Delete messages by id. Unknown ids are ignored; exchanges are kept even when emptied.")]
    async fn messages_delete(&self, params: Parameters<MessagesDeleteParams>) -> Result<CallToolResult, McpError> {
        messages::delete_impl(&self.db, params.0).await
    }

    #[tool(
        description = "Merge two or more exchanges into the lowest id. Messages are moved and re-indexed in chronological order."
    )]
    async fn exchanges_merge(&self, params: Parameters<ExchangesMergeParams>) -> Result<CallToolResult, McpError> {
        exchanges::merge_impl(&self.db, params.0).await
    }

    #[tool(description = "Read a raw cached value by its cache key.")]
    async fn cache_get(&self, params: Parameters<CacheGetParams>) -> Result<CallToolResult, McpError> {
        cache_tools::get_impl(&self.db, params.0).await
    }

    #[tool(description = "List cache keys written by the primary extraction pass.")]
    async fn cache_indexed_keys(&self, params: Parameters<CacheIndexedKeysParams>) -> Result<CallToolResult, McpError> {
        cache_tools::indexed_keys_impl(&self.db, params.0).await
    }
}

impl ServerHandler for MementoServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "memento".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Browse and curate chat exchanges extracted into the memento cache: list, inspect, delete, and merge."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_all_tools_registered() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let server = MementoServer::new(db, 20);

        let mut names: Vec<String> = server.tool_router.list_all().into_iter().map(|tool| tool.name.to_string()).collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "cache_get",
                "cache_indexed_keys",
                "exchange_delete",
                "exchange_get",
                "exchanges_list",
                "exchanges_merge",
                "messages_delete",
            ]
        );
    }

    #[tokio::test]
    async fn test_server_info() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let info = MementoServer::new(db, 20).get_info();
        assert_eq!(info.server_info.name, "memento");
        assert!(info.capabilities.tools.is_some());
    }
}
