//! Structural edits of the exchange/message projection.
//!
//! Every operation runs in a single transaction; a failure at any step
//! rolls the whole operation back.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{OptionalExtension, params_from_iter};

/// Upper bound on ids bound into one `IN (...)` clause.
const MAX_BINDINGS: usize = 500;

/// Chronological sort key of a message.
///
/// Parses `DD.MM.YY` (21st century) and `HH:MM[:SS]`. Returns None when
/// either part is missing or unparseable.
pub fn message_timestamp(date: Option<&str>, time: Option<&str>) -> Option<NaiveDateTime> {
    let mut date_parts = date?.split('.').map(|part| part.trim().parse::<u32>());
    let day = date_parts.next()?.ok()?;
    let month = date_parts.next()?.ok()?;
    let year = date_parts.next()?.ok()?;
    if date_parts.next().is_some() {
        return None;
    }

    let mut time_parts = time?.split(':').map(|part| part.trim().parse::<u32>());
    let hour = time_parts.next()?.ok()?;
    let minute = time_parts.next()?.ok()?;
    let second = match time_parts.next() {
        Some(second) => second.ok()?,
        None => 0,
    };
    if time_parts.next().is_some() {
        return None;
    }

    let date = NaiveDate::from_ymd_opt(2000 + i32::try_from(year).ok()?, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    Some(NaiveDateTime::new(date, time))
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

impl CacheDb {
    /// Delete one exchange and, by cascade, its messages.
    ///
    /// Returns false if the exchange does not exist or the delete failed
    /// and was rolled back.
    pub async fn delete_exchange(&self, exchange_id: i64) -> Result<bool, Error> {
        self.ensure_initialized().await?;

        let result = self
            .conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                let deleted = tx.execute("DELETE FROM exchanges WHERE exchange_id = ?1", params![exchange_id])?;
                if deleted == 0 {
                    return Ok(false);
                }
                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(Error::from);

        match result {
            Ok(true) => {
                tracing::info!(exchange_id, "deleted exchange and its messages");
                Ok(true)
            }
            Ok(false) => {
                tracing::warn!(exchange_id, "exchange to delete not found");
                Ok(false)
            }
            Err(e) => {
                tracing::error!(operation = "delete_exchange", exchange_id, error = %e, "rolled back exchange delete");
                Ok(false)
            }
        }
    }

    /// Delete every message whose id is in `message_ids`.
    ///
    /// Unknown ids are ignored and owning exchanges are kept even when they
    /// become empty. Returns the number of messages removed; a failed delete
    /// is rolled back and reports 0.
    pub async fn delete_messages(&self, message_ids: &[i64]) -> Result<u64, Error> {
        if message_ids.is_empty() {
            return Ok(0);
        }
        self.ensure_initialized().await?;

        let ids = message_ids.to_vec();
        let result = self
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let tx = conn.transaction()?;
                let mut deleted = 0u64;
                for chunk in ids.chunks(MAX_BINDINGS) {
                    let sql = format!("DELETE FROM messages WHERE message_id IN ({})", placeholders(chunk.len()));
                    deleted += tx.execute(&sql, params_from_iter(chunk.iter()))? as u64;
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await
            .map_err(Error::from);

        match result {
            Ok(deleted) => {
                if deleted > 0 {
                    tracing::info!(deleted, requested = message_ids.len(), "deleted messages");
                } else {
                    tracing::warn!(ids = ?message_ids, "no messages matched delete request");
                }
                Ok(deleted)
            }
            Err(e) => {
                tracing::error!(operation = "delete_messages", ids = ?message_ids, error = %e, "rolled back message delete");
                Ok(0)
            }
        }
    }

    /// Delete all messages of one exchange, keeping the exchange itself.
    ///
    /// Returns false if the exchange does not exist or the delete failed.
    pub async fn clear_exchange_messages(&self, exchange_id: i64) -> Result<bool, Error> {
        self.ensure_initialized().await?;

        let result = self
            .conn
            .call(move |conn| -> Result<Option<usize>, Error> {
                let tx = conn.transaction()?;
                let exists = tx
                    .query_row("SELECT 1 FROM exchanges WHERE exchange_id = ?1", params![exchange_id], |_| Ok(()))
                    .optional()?
                    .is_some();
                if !exists {
                    return Ok(None);
                }
                let cleared = tx.execute("DELETE FROM messages WHERE exchange_id = ?1", params![exchange_id])?;
                tx.commit()?;
                Ok(Some(cleared))
            })
            .await
            .map_err(Error::from);

        match result {
            Ok(Some(cleared)) => {
                tracing::info!(exchange_id, cleared, "cleared exchange messages");
                Ok(true)
            }
            Ok(None) => {
                tracing::warn!(exchange_id, "exchange to clear not found");
                Ok(false)
            }
            Err(e) => {
                tracing::error!(operation = "clear_exchange_messages", exchange_id, error = %e, "rolled back clear");
                Ok(false)
            }
        }
    }

    /// Merge exchanges into the lowest id among them.
    ///
    /// Messages of the other exchanges move to the target, the emptied
    /// exchanges are deleted, and every message of the target is re-indexed
    /// in chronological order. Messages without a parseable date and time sort
    /// last; ties keep message id order. Returns the target exchange id.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidArgument` if fewer than two ids are given or they
    ///   name a single exchange.
    /// - `Error::NotFound` if any id does not exist; nothing is changed.
    /// - `Error::Transaction` if a storage step fails; nothing is changed.
    pub async fn merge_exchanges(&self, exchange_ids: &[i64]) -> Result<i64, Error> {
        if exchange_ids.len() < 2 {
            return Err(Error::InvalidArgument("merge requires at least two exchange ids".into()));
        }
        self.ensure_initialized().await?;

        let requested: BTreeSet<i64> = exchange_ids.iter().copied().collect();
        let result = self
            .conn
            .call(move |conn| -> Result<(i64, usize), Error> {
                let tx = conn.transaction()?;

                let mut missing = Vec::new();
                for &id in &requested {
                    let found = tx
                        .query_row("SELECT 1 FROM exchanges WHERE exchange_id = ?1", params![id], |_| Ok(()))
                        .optional()?;
                    if found.is_none() {
                        missing.push(id);
                    }
                }
                if !missing.is_empty() {
                    return Err(Error::NotFound(format!("exchanges {missing:?}")));
                }

                let mut ids = requested.into_iter();
                let Some(target) = ids.next() else {
                    return Err(Error::InvalidArgument("merge requires at least two exchange ids".into()));
                };
                let sources: Vec<i64> = ids.collect();
                if sources.is_empty() {
                    return Err(Error::InvalidArgument(format!("merge of exchange {target} with itself")));
                }

                for &source in &sources {
                    tx.execute(
                        "UPDATE messages SET exchange_id = ?1 WHERE exchange_id = ?2",
                        params![target, source],
                    )?;
                    tx.execute("DELETE FROM exchanges WHERE exchange_id = ?1", params![source])?;
                }

                let mut messages = {
                    let mut stmt = tx.prepare(
                        "SELECT message_id, date, time FROM messages WHERE exchange_id = ?1 ORDER BY message_id",
                    )?;
                    let rows = stmt
                        .query_map(params![target], |row| {
                            let date: Option<String> = row.get(1)?;
                            let time: Option<String> = row.get(2)?;
                            Ok((row.get::<_, i64>(0)?, message_timestamp(date.as_deref(), time.as_deref())))
                        })?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows
                };
                messages.sort_by_key(|(_, timestamp)| (timestamp.is_none(), *timestamp));

                {
                    let mut reindex =
                        tx.prepare_cached("UPDATE messages SET message_index_in_exchange = ?1 WHERE message_id = ?2")?;
                    for (index, (message_id, _)) in messages.iter().enumerate() {
                        reindex.execute(params![index as i64, message_id])?;
                    }
                }

                tx.commit()?;
                Ok((target, messages.len()))
            })
            .await
            .map_err(Error::from);

        match result {
            Ok((target, reindexed)) => {
                tracing::info!(ids = ?exchange_ids, target, reindexed, "merged exchanges");
                Ok(target)
            }
            Err(e) => {
                tracing::error!(operation = "merge_exchanges", ids = ?exchange_ids, error = %e, "rolled back merge");
                Err(Error::in_transaction("merge_exchanges", e))
            }
        }
    }
}
