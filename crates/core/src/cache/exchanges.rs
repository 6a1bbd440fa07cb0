//! Read access to the exchange/message projection.
//!
//! Listing is best-effort: storage failures degrade to an empty page so
//! browsing stays available. Detail fetches propagate storage errors.

use std::fmt;
use std::str::FromStr;

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row};

/// Largest accepted page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One stored chat line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct Message {
    pub message_id: i64,
    pub message_index_in_exchange: i64,
    pub date: Option<String>,
    pub time: Option<String>,
    pub person: Option<String>,
    pub quote: Option<String>,
}

impl Message {
    /// Decode columns `offset..offset + 6` of a row.
    fn from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            message_id: row.get(offset)?,
            message_index_in_exchange: row.get(offset + 1)?,
            date: row.get(offset + 2)?,
            time: row.get(offset + 3)?,
            person: row.get(offset + 4)?,
            quote: row.get(offset + 5)?,
        })
    }
}

/// List item: an exchange with its first message as a preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExchangeSummary {
    pub id: i64,
    pub cache_key: String,
    pub exchange_index: i64,
    pub first_message: Option<Message>,
}

/// An exchange with all of its messages in stored order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExchangeDetail {
    pub id: i64,
    pub cache_key: String,
    pub exchange_index: i64,
    pub messages: Vec<Message>,
}

/// A message together with where it was projected from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ProjectedMessage {
    pub cache_key: String,
    pub exchange_id: i64,
    pub exchange_index: i64,
    #[serde(flatten)]
    pub message: Message,
}

/// Pagination metadata of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub page_size: u32,
    pub total_items: u64,
    pub total_pages: u64,
    pub has_more: bool,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total_items: u64) -> Self {
        let size = u64::from(page_size.max(1));
        Self {
            current_page: page,
            page_size,
            total_items,
            total_pages: total_items.div_ceil(size),
            has_more: u64::from(page) * size < total_items,
        }
    }

    /// Zeroed pagination reported when a listing degrades.
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self { current_page: page, page_size, total_items: 0, total_pages: 0, has_more: false }
    }
}

/// One page of exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ExchangePage {
    pub items: Vec<ExchangeSummary>,
    pub pagination: Pagination,
}

/// Ordering of a listing by the first message's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Oldest first; exchanges without a first message last.
    #[default]
    Asc,
    /// Newest first; exchanges without a first message first.
    Desc,
    /// Exchange id order.
    None,
}

impl SortOrder {
    fn order_clause(self) -> &'static str {
        match self {
            SortOrder::Asc => "ORDER BY sort_key IS NULL ASC, sort_key ASC, e.exchange_id ASC",
            SortOrder::Desc => "ORDER BY sort_key IS NULL DESC, sort_key DESC, e.exchange_id DESC",
            SortOrder::None => "ORDER BY e.exchange_id ASC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            "none" => Ok(SortOrder::None),
            other => Err(Error::InvalidArgument(format!("invalid sort order {other:?}, expected asc, desc or none"))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
            SortOrder::None => "none",
        };
        f.write_str(name)
    }
}

/// Each exchange joined with its first message (lowest id at index 0) and a
/// sortable `YYYY-MM-DDTHH:MM:SS` key derived from its `DD.MM.YY` date.
const LIST_SQL: &str = "
    SELECT e.exchange_id, e.cache_key, e.exchange_index,
           fm.message_id, fm.message_index_in_exchange, fm.date, fm.time, fm.person, fm.quote,
           CASE
               WHEN fm.date IS NOT NULL AND fm.time IS NOT NULL THEN
                   '20' || substr(fm.date, 7, 2) || '-' || substr(fm.date, 4, 2) || '-' || substr(fm.date, 1, 2)
                   || 'T' || fm.time
           END AS sort_key
    FROM exchanges e
    LEFT JOIN messages fm ON fm.message_id = (
        SELECT MIN(m.message_id) FROM messages m
        WHERE m.exchange_id = e.exchange_id AND m.message_index_in_exchange = 0
    )";

impl CacheDb {
    /// List exchanges one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidArgument` if `page` is 0 or `page_size` is
    /// outside `1..=100`. Storage failures are logged and produce an empty
    /// page with zeroed pagination.
    pub async fn list_exchanges(&self, page: u32, page_size: u32, sort: SortOrder) -> Result<ExchangePage, Error> {
        if page == 0 {
            return Err(Error::InvalidArgument("page must be at least 1".into()));
        }
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidArgument(format!("page_size must be between 1 and {MAX_PAGE_SIZE}")));
        }

        self.ensure_initialized().await?;

        let limit = i64::from(page_size);
        let offset = (i64::from(page) - 1) * limit;
        let sql = format!("{LIST_SQL} {} LIMIT ?1 OFFSET ?2", sort.order_clause());

        let result = self
            .conn
            .call(move |conn| -> Result<(u64, Vec<ExchangeSummary>), Error> {
                let total: i64 = conn.query_row("SELECT COUNT(*) FROM exchanges", [], |row| row.get(0))?;

                let mut stmt = conn.prepare(&sql)?;
                let items = stmt
                    .query_map(params![limit, offset], |row| {
                        let first_message = match row.get::<_, Option<i64>>(3)? {
                            Some(_) => Some(Message::from_row(row, 3)?),
                            None => None,
                        };
                        Ok(ExchangeSummary {
                            id: row.get(0)?,
                            cache_key: row.get(1)?,
                            exchange_index: row.get(2)?,
                            first_message,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok((total.max(0) as u64, items))
            })
            .await
            .map_err(Error::from);

        match result {
            Ok((total, items)) => Ok(ExchangePage { items, pagination: Pagination::new(page, page_size, total) }),
            Err(e) => {
                tracing::error!(page, page_size, sort = %sort, error = %e, "failed to list exchanges");
                Ok(ExchangePage { items: Vec::new(), pagination: Pagination::empty(page, page_size) })
            }
        }
    }

    /// Get one exchange with all its messages, ordered by position.
    ///
    /// Returns None if the exchange doesn't exist.
    pub async fn get_exchange(&self, exchange_id: i64) -> Result<Option<ExchangeDetail>, Error> {
        self.ensure_initialized().await?;

        let detail = self
            .conn
            .call(move |conn| -> Result<Option<ExchangeDetail>, Error> {
                let header = conn
                    .query_row(
                        "SELECT cache_key, exchange_index FROM exchanges WHERE exchange_id = ?1",
                        params![exchange_id],
                        |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
                    )
                    .optional()?;

                let Some((cache_key, exchange_index)) = header else {
                    return Ok(None);
                };

                let mut stmt = conn.prepare(
                    "SELECT message_id, message_index_in_exchange, date, time, person, quote
                     FROM messages WHERE exchange_id = ?1
                     ORDER BY message_index_in_exchange ASC, message_id ASC",
                )?;
                let messages = stmt
                    .query_map(params![exchange_id], |row| Message::from_row(row, 0))?
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(Some(ExchangeDetail { id: exchange_id, cache_key, exchange_index, messages }))
            })
            .await
            .map_err(Error::from)?;

        match &detail {
            Some(d) => tracing::debug!(exchange_id, messages = d.messages.len(), "loaded exchange"),
            None => tracing::debug!(exchange_id, "exchange not found"),
        }
        Ok(detail)
    }

    /// All messages projected from one cache key, in exchange then message order.
    ///
    /// Best-effort like listing: storage failures yield an empty list.
    pub async fn messages_for_cache_key(&self, cache_key: &str) -> Result<Vec<ProjectedMessage>, Error> {
        self.ensure_initialized().await?;

        let owned_key = cache_key.to_string();
        let result = self
            .query_projected(
                "WHERE e.cache_key = ?1 ORDER BY e.exchange_index, m.message_index_in_exchange, m.message_id",
                owned_key,
            )
            .await;

        Ok(result.unwrap_or_else(|e| {
            tracing::error!(cache_key, error = %e, "failed to load messages for cache key");
            Vec::new()
        }))
    }

    /// Messages sent by `person` across every cache key.
    ///
    /// Best-effort like listing: storage failures yield an empty list.
    pub async fn messages_by_person(&self, person: &str) -> Result<Vec<ProjectedMessage>, Error> {
        self.ensure_initialized().await?;

        let result = self
            .query_projected(
                "WHERE m.person = ?1 ORDER BY e.cache_key, e.exchange_index, m.message_index_in_exchange, m.message_id",
                person.to_string(),
            )
            .await;

        Ok(result.unwrap_or_else(|e| {
            tracing::error!(person, error = %e, "failed to search messages by person");
            Vec::new()
        }))
    }

    async fn query_projected(&self, filter: &'static str, arg: String) -> Result<Vec<ProjectedMessage>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<ProjectedMessage>, Error> {
                let sql = format!(
                    "SELECT e.cache_key, e.exchange_id, e.exchange_index,
                            m.message_id, m.message_index_in_exchange, m.date, m.time, m.person, m.quote
                     FROM messages m
                     JOIN exchanges e ON m.exchange_id = e.exchange_id
                     {filter}"
                );
                let mut stmt = conn.prepare(&sql)?;
                let messages = stmt
                    .query_map(params![arg], |row| {
                        Ok(ProjectedMessage {
                            cache_key: row.get(0)?,
                            exchange_id: row.get(1)?,
                            exchange_index: row.get(2)?,
                            message: Message::from_row(row, 3)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(messages)
            })
            .await
            .map_err(Error::from)
    }
}
