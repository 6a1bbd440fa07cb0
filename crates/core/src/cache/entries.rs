//! Raw cache entries and the provenance index.
//!
//! A write stores the encoded value, refreshes its relational projection and
//! updates the provenance index in one transaction.

use super::connection::CacheDb;
use super::normalize::{self, CacheValue};
use crate::Error;
use serde_json::Value;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::OptionalExtension;

/// Origin tag of the primary extraction pass.
///
/// Writes carrying this tag are recorded in the provenance index.
pub const EXTRACTION_ORIGIN: &str = "extract::chunk";

impl CacheDb {
    /// Read a cached value by key.
    ///
    /// Returns None if the key is unknown. A stored payload that is no longer
    /// valid JSON is returned as a JSON string holding the raw text.
    pub async fn read(&self, key: &str) -> Result<Option<Value>, Error> {
        self.ensure_initialized().await?;

        let owned_key = key.to_string();
        let raw = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let raw = conn
                    .query_row("SELECT value FROM cache_entries WHERE key = ?1", params![owned_key], |row| row.get(0))
                    .optional()?;
                Ok(raw)
            })
            .await
            .map_err(Error::from)?;

        let Some(raw) = raw else {
            tracing::debug!(cache_key = key, "cache miss");
            return Ok(None);
        };

        tracing::debug!(cache_key = key, "cache hit");
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(cache_key = key, error = %e, "cached value is not valid JSON, returning raw text");
                Ok(Some(Value::String(raw)))
            }
        }
    }

    /// Write a value to the cache.
    ///
    /// Upserts the raw entry, replaces its exchange/message projection when
    /// the value is exchange-shaped and, when `origin` is [`EXTRACTION_ORIGIN`],
    /// adds the key to the provenance index. Either all effects commit or none
    /// do.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` before touching storage if the value
    /// cannot be encoded, and `Error::Transaction` if any step fails.
    pub async fn write(&self, key: &str, value: &CacheValue, origin: Option<&str>) -> Result<(), Error> {
        self.ensure_initialized().await?;

        let encoded = value.encode()?;
        let owned_key = key.to_string();
        let value = value.clone();
        let indexed = origin == Some(EXTRACTION_ORIGIN);
        let created_at = chrono::Utc::now().to_rfc3339();

        let result = self
            .conn
            .call(move |conn| -> Result<normalize::Projection, Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO cache_entries (key, value, created_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                         value = excluded.value,
                         created_at = excluded.created_at",
                    params![owned_key, encoded, created_at],
                )?;

                let projection = normalize::replace_projection(&tx, &owned_key, &value)?;

                if indexed {
                    tx.execute("INSERT OR IGNORE INTO indexed_keys (key) VALUES (?1)", params![owned_key])?;
                }

                tx.commit()?;
                Ok(projection)
            })
            .await
            .map_err(Error::from);

        match result {
            Ok(projection) => {
                tracing::debug!(
                    cache_key = key,
                    indexed,
                    exchanges = projection.exchanges,
                    messages = projection.messages,
                    "cache entry committed"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(operation = "write_cache", cache_key = key, error = %e, "rolled back cache write");
                Err(Error::in_transaction("write_cache", e))
            }
        }
    }

    /// List keys recorded in the provenance index, in key order.
    ///
    /// Best-effort: storage failures are logged and yield an empty list.
    pub async fn indexed_keys(&self) -> Vec<String> {
        if let Err(e) = self.ensure_initialized().await {
            tracing::error!(error = %e, "failed to list indexed keys");
            return Vec::new();
        }

        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT key FROM indexed_keys ORDER BY key")?;
                let keys = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "failed to list indexed keys");
                Vec::new()
            })
    }

    /// Delete a raw cache entry.
    ///
    /// Cascades to the entry's exchanges, their messages and its provenance
    /// index row. Returns whether an entry was removed.
    pub async fn delete_entry(&self, key: &str) -> Result<bool, Error> {
        self.ensure_initialized().await?;

        let owned_key = key.to_string();
        let deleted = self
            .conn
            .call(move |conn| -> Result<usize, Error> {
                Ok(conn.execute("DELETE FROM cache_entries WHERE key = ?1", params![owned_key])?)
            })
            .await
            .map_err(Error::from)?;

        if deleted > 0 {
            tracing::info!(cache_key = key, "deleted cache entry");
        }
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::hash::compute_cache_key;
    use crate::cache::normalize::{ExtractionResult, MessageRecord};
    use serde_json::json;

    async fn count(db: &CacheDb, sql: &'static str) -> i64 {
        db.conn
            .call(move |conn| conn.query_row(sql, [], |row| row.get(0)))
            .await
            .unwrap()
    }

    fn sample_result() -> ExtractionResult {
        ExtractionResult::from_messages(vec![
            vec![
                MessageRecord::new("01.01.25", "09:00:00", "Ana", "good morning"),
                MessageRecord::new("01.01.25", "09:01:00", "Ben", "morning!"),
            ],
            vec![MessageRecord::new("01.01.25", "21:00:00", "Ana", "sleep well")],
        ])
    }

    #[tokio::test]
    async fn test_write_and_read_round_trip() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let key = compute_cache_key("chat.txt_day_chunk_0", None);
        let value = json!({"nested": {"list": [1, 2.5, "three", null, true]}});

        db.write(&key, &CacheValue::Opaque(value.clone()), None).await.unwrap();

        let read = db.read(&key).await.unwrap().unwrap();
        assert_eq!(read, value);
    }

    #[tokio::test]
    async fn test_read_missing() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(db.read("nonexistent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_returns_raw_text_for_bad_json() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.ensure_initialized().await.unwrap();
        db.conn
            .call(|conn| {
                conn.execute(
                    "INSERT INTO cache_entries (key, value, created_at) VALUES ('legacy', 'not json {', '2024-01-01')",
                    [],
                )
            })
            .await
            .unwrap();

        let read = db.read("legacy").await.unwrap().unwrap();
        assert_eq!(read, Value::String("not json {".to_string()));
    }

    #[tokio::test]
    async fn test_write_projects_exchanges() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.write("k1", &sample_result().into(), None).await.unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM exchanges").await, 2);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM messages").await, 3);
    }

    #[tokio::test]
    async fn test_rewrite_replaces_projection() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.write("k1", &sample_result().into(), None).await.unwrap();

        let second = ExtractionResult::from_messages(vec![vec![MessageRecord::new("02.01.25", "10:00:00", "Ben", "new")]]);
        db.write("k1", &second.into(), None).await.unwrap();

        assert_eq!(count(&db, "SELECT COUNT(*) FROM exchanges").await, 1);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM messages").await, 1);
        let quote: String = db
            .conn
            .call(|conn| conn.query_row("SELECT quote FROM messages", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(quote, "new");
    }

    #[tokio::test]
    async fn test_opaque_rewrite_keeps_projection() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.write("k1", &sample_result().into(), None).await.unwrap();
        db.write("k1", &CacheValue::Opaque(json!("no longer shaped")), None)
            .await
            .unwrap();

        assert_eq!(db.read("k1").await.unwrap().unwrap(), json!("no longer shaped"));
        assert_eq!(count(&db, "SELECT COUNT(*) FROM exchanges").await, 2);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM messages").await, 3);
    }

    #[tokio::test]
    async fn test_shaped_write_reads_back_unchanged() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let value = json!({
            "model": "gpt",
            "exchanges": [
                [{"date": "01.01.25", "time": null, "person": "Ana", "quote": "hi", "lang": "de"}],
                [{"date": "01.01.25", "time": 930, "person": "Ben", "quote": "yo", "seen": true}]
            ]
        });

        db.write("k1", &CacheValue::from_json(value.clone()), None).await.unwrap();

        assert_eq!(db.read("k1").await.unwrap().unwrap(), value);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM messages").await, 2);
        let time: String = db
            .conn
            .call(|conn| conn.query_row("SELECT time FROM messages WHERE person = 'Ben'", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(time, "930");
    }

    #[tokio::test]
    async fn test_origin_tag_updates_index() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.write("b", &sample_result().into(), Some(EXTRACTION_ORIGIN))
            .await
            .unwrap();
        db.write("a", &sample_result().into(), Some(EXTRACTION_ORIGIN))
            .await
            .unwrap();
        db.write("c", &sample_result().into(), Some("filter::best"))
            .await
            .unwrap();
        db.write("b", &sample_result().into(), Some(EXTRACTION_ORIGIN))
            .await
            .unwrap();

        assert_eq!(db.indexed_keys().await, vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn test_untagged_rewrite_keeps_index_membership() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.write("a", &sample_result().into(), Some(EXTRACTION_ORIGIN))
            .await
            .unwrap();
        db.write("a", &sample_result().into(), None).await.unwrap();

        assert_eq!(db.indexed_keys().await, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_projection_rolls_back_raw_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.ensure_initialized().await.unwrap();
        db.conn
            .call(|conn| {
                conn.execute_batch(
                    "CREATE TRIGGER reject_messages BEFORE INSERT ON messages
                     BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
                )
            })
            .await
            .unwrap();

        let result = db.write("k1", &sample_result().into(), Some(EXTRACTION_ORIGIN)).await;
        assert!(matches!(result, Err(Error::Transaction { operation: "write_cache", .. })));

        assert!(db.read("k1").await.unwrap().is_none());
        assert!(db.indexed_keys().await.is_empty());
        assert_eq!(count(&db, "SELECT COUNT(*) FROM exchanges").await, 0);
    }

    #[tokio::test]
    async fn test_delete_entry_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.write("k1", &sample_result().into(), Some(EXTRACTION_ORIGIN))
            .await
            .unwrap();

        assert!(db.delete_entry("k1").await.unwrap());
        assert!(!db.delete_entry("k1").await.unwrap());

        assert_eq!(count(&db, "SELECT COUNT(*) FROM exchanges").await, 0);
        assert_eq!(count(&db, "SELECT COUNT(*) FROM messages").await, 0);
        assert!(db.indexed_keys().await.is_empty());
    }
}
