//! Adapter-level errors for the memento server.
//!
//! Raised for requests that the core layer would otherwise answer with a
//! plain `false` or `0`.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Structured errors for the memento server.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Request parameters rejected before reaching the cache.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The addressed entity does not exist.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(msg) => (-32602, msg.clone()),
            ToolError::NotFound(msg) => (-32001, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
