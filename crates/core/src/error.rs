//! Unified error types for memento.
//!
//! Display strings carry a stable code prefix so adapters and logs can
//! classify failures without matching on variants.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error type for the cache, projection and mutation layers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing store could not be opened or its schema could not be created.
    #[error("STORAGE_UNAVAILABLE: {0}")]
    StorageUnavailable(String),

    /// A value could not be encoded for the raw cache.
    #[error("SERIALIZATION_ERROR: {0}")]
    Serialization(String),

    /// Caller-level contract violation, rejected before any storage access.
    #[error("INVALID_ARGUMENT: {0}")]
    InvalidArgument(String),

    /// Target entity does not exist.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// A multi-step mutation failed and was rolled back.
    #[error("TRANSACTION_FAILED: {operation}: {reason}")]
    Transaction { operation: &'static str, reason: String },

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// The upstream generator failed to produce a result.
    #[error("GENERATION_FAILED: {0}")]
    Generation(String),
}

impl Error {
    /// Wrap a failure raised inside a mutating transaction.
    ///
    /// Caller-level variants pass through untouched so adapters can still
    /// tell a bad id apart from an internal fault.
    pub(crate) fn in_transaction(operation: &'static str, err: Error) -> Self {
        match err {
            Error::InvalidArgument(_) | Error::NotFound(_) | Error::Transaction { .. } => err,
            other => Error::Transaction { operation, reason: other.to_string() },
        }
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidArgument(msg) => (-32602, msg.clone()),
            Error::Serialization(msg) => (-32602, msg.clone()),
            Error::NotFound(msg) => (-32001, msg.clone()),
            Error::StorageUnavailable(msg) => (-32002, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::Transaction { .. } => (-32603, err.to_string()),
            Error::Generation(msg) => (-32603, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("exchange 42".to_string());
        assert!(err.to_string().contains("NOT_FOUND"));
        assert!(err.to_string().contains("exchange 42"));
    }

    #[test]
    fn test_error_to_mcp_error() {
        let not_found: McpError = Error::NotFound("exchange 42".to_string()).into();
        assert_eq!(not_found.code.0, -32001);

        let invalid: McpError = Error::InvalidArgument("sort".to_string()).into();
        assert_eq!(invalid.code.0, -32602);

        let failed: McpError = Error::Transaction { operation: "merge_exchanges", reason: "disk".into() }.into();
        assert_eq!(failed.code.0, -32603);
        assert!(failed.message.contains("merge_exchanges"));
    }

    #[test]
    fn test_in_transaction_keeps_caller_errors() {
        let err = Error::in_transaction("merge_exchanges", Error::NotFound("exchange 9".into()));
        assert!(matches!(err, Error::NotFound(_)));

        let err = Error::in_transaction("merge_exchanges", Error::Serialization("bad".into()));
        assert!(matches!(err, Error::Transaction { operation: "merge_exchanges", .. }));
    }
}
