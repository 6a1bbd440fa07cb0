//! Exchange MCP tools.
//!
//! Listing, inspection and structural edits of the exchange projection.

pub mod delete;
pub mod get;
pub mod list;
pub mod merge;

pub use delete::{ExchangeDeleteParams, delete_impl};
pub use get::{ExchangeGetParams, get_impl};
pub use list::{ExchangesListParams, list_impl};
pub use merge::{ExchangesMergeParams, merge_impl};

#[cfg(test)]
pub(crate) mod fixtures {
    use memento_core::{CacheDb, ExtractionResult, MessageRecord};

    /// Seed one key with three exchanges and return their ids in order.
    ///
    /// The first exchange is empty; the other two hold messages at 08:00,
    /// then 10:00 and 09:00 on the same day.
    pub async fn seeded() -> (CacheDb, Vec<i64>) {
        let db = CacheDb::open_in_memory().await.unwrap();
        let result = ExtractionResult::from_messages(vec![
            vec![],
            vec![MessageRecord::new("01.01.25", "08:00:00", "Ana", "coffee?")],
            vec![
                MessageRecord::new("01.01.25", "10:00:00", "Ben", "running late"),
                MessageRecord::new("01.01.25", "09:00:00", "Ana", "on my way"),
            ],
        ]);
        db.write("day-1", &result.into(), None).await.unwrap();

        let page = db.list_exchanges(1, 100, memento_core::SortOrder::None).await.unwrap();
        let mut ids: Vec<i64> = page.items.iter().map(|item| item.id).collect();
        ids.sort_unstable();
        (db, ids)
    }
}
