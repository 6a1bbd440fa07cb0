//! exchanges_list tool implementation.
//!
//! Paginated listing of exchanges with a first-message preview.

use memento_core::{CacheDb, SortOrder};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tools::json_result;

/// Parameters for the exchanges_list tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ExchangesListParams {
    /// 1-based page number (default 1).
    pub page: Option<u32>,

    /// Items per page, 1 to 100 (server default when omitted).
    pub page_size: Option<u32>,

    /// "asc" (default), "desc" or "none" ordering by first message time.
    pub sort: Option<String>,
}

/// Implementation of the exchanges_list tool.
pub async fn list_impl(
    cache: &CacheDb, default_page_size: u32, params: ExchangesListParams,
) -> Result<CallToolResult, McpError> {
    let sort = match params.sort.as_deref() {
        Some(raw) => raw.parse::<SortOrder>()?,
        None => SortOrder::default(),
    };
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or(default_page_size);

    let listing = cache.list_exchanges(page, page_size, sort).await?;
    json_result(&listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::decode;
    use crate::tools::exchanges::fixtures::seeded;
    use memento_core::cache::ExchangePage;

    #[tokio::test]
    async fn test_list_defaults() {
        let (cache, ids) = seeded().await;

        let result = list_impl(&cache, 20, ExchangesListParams::default()).await.unwrap();
        let page: ExchangePage = decode(&result);

        assert_eq!(page.pagination.total_items, 3);
        assert_eq!(page.pagination.page_size, 20);
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.items[0].id, ids[1]);
        assert!(page.items[2].first_message.is_none());
    }

    #[tokio::test]
    async fn test_list_desc_second_page() {
        let (cache, _) = seeded().await;
        let params = ExchangesListParams { page: Some(2), page_size: Some(2), sort: Some("DESC".into()) };

        let result = list_impl(&cache, 20, params).await.unwrap();
        let page: ExchangePage = decode(&result);

        assert_eq!(page.items.len(), 1);
        assert_eq!(page.pagination.total_pages, 2);
        assert!(!page.pagination.has_more);
    }

    #[tokio::test]
    async fn test_list_rejects_bad_arguments() {
        let (cache, _) = seeded().await;

        let bad_sort = ExchangesListParams { sort: Some("sideways".into()), ..Default::default() };
        assert_eq!(list_impl(&cache, 20, bad_sort).await.unwrap_err().code.0, -32602);

        let bad_size = ExchangesListParams { page_size: Some(101), ..Default::default() };
        assert_eq!(list_impl(&cache, 20, bad_size).await.unwrap_err().code.0, -32602);

        let bad_page = ExchangesListParams { page: Some(0), ..Default::default() };
        assert_eq!(list_impl(&cache, 20, bad_page).await.unwrap_err().code.0, -32602);
    }
}
