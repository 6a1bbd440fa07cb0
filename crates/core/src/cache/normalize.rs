//! Projection of exchange-shaped cache values into relational rows.
//!
//! A cache write carries a [`CacheValue`] that is classified once, at the
//! call site, as either opaque JSON or an [`ExtractionResult`]. Only the
//! latter produces exchange and message rows.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::Transaction;

use super::finite;
use crate::Error;

/// Field of an exchange-shaped value that holds the nested exchange list.
pub const EXCHANGES_FIELD: &str = "exchanges";

/// One chat line as returned by the extraction pass.
///
/// Every field is optional: missing or non-textual fields are stored as NULL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct MessageRecord {
    /// Date in `DD.MM.YY` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Time in `HH:MM:SS` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Speaker label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
    /// Message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<String>,
}

impl MessageRecord {
    pub fn new(date: &str, time: &str, person: &str, quote: &str) -> Self {
        Self {
            date: Some(date.to_string()),
            time: Some(time.to_string()),
            person: Some(person.to_string()),
            quote: Some(quote.to_string()),
        }
    }

    fn from_object(object: &Map<String, Value>) -> Self {
        let text = |field: &str| match object.get(field) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(Value::Bool(b)) => Some(b.to_string()),
            _ => None,
        };

        Self { date: text("date"), time: text("time"), person: text("person"), quote: text("quote") }
    }
}

/// An item inside one exchange list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageEntry {
    Record(MessageRecord),
    /// Anything that is not a JSON object; skipped during projection.
    Malformed(Value),
}

impl From<Value> for MessageEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(object) => MessageEntry::Record(MessageRecord::from_object(&object)),
            other => MessageEntry::Malformed(other),
        }
    }
}

impl<'de> Deserialize<'de> for MessageEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(MessageEntry::from)
    }
}

/// An item of the outer exchange list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExchangeEntry {
    Messages(Vec<MessageEntry>),
    /// Anything that is not a JSON array; skipped during projection.
    Malformed(Value),
}

impl From<Value> for ExchangeEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(items) => ExchangeEntry::Messages(items.into_iter().map(MessageEntry::from).collect()),
            other => ExchangeEntry::Malformed(other),
        }
    }
}

impl<'de> Deserialize<'de> for ExchangeEntry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(ExchangeEntry::from)
    }
}

/// Result of extracting noteworthy exchanges from one transcript chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub exchanges: Vec<ExchangeEntry>,
}

impl ExtractionResult {
    /// Build a result from well-formed exchanges.
    pub fn from_messages(exchanges: Vec<Vec<MessageRecord>>) -> Self {
        let exchanges = exchanges
            .into_iter()
            .map(|messages| ExchangeEntry::Messages(messages.into_iter().map(MessageEntry::Record).collect()))
            .collect();
        Self { exchanges }
    }

    /// Number of well-formed messages across all well-formed exchanges.
    pub fn message_count(&self) -> usize {
        self.exchanges
            .iter()
            .map(|entry| match entry {
                ExchangeEntry::Messages(items) => items
                    .iter()
                    .filter(|item| matches!(item, MessageEntry::Record(_)))
                    .count(),
                ExchangeEntry::Malformed(_) => 0,
            })
            .sum()
    }
}

/// Payload of a cache write.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    /// Arbitrary JSON; stored as-is and never projected.
    Opaque(Value),
    /// Exchange-shaped result; stored and projected into rows.
    Exchanges {
        result: ExtractionResult,
        /// JSON the result was decoded from. When present it is what the raw
        /// store keeps, so fields the projection ignores survive a round trip.
        source: Option<Value>,
    },
}

impl CacheValue {
    /// Encode any serializable value as an opaque payload.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the value cannot be represented as
    /// JSON, including NaN or infinite floats.
    pub fn opaque<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        finite::ensure_finite(value)?;
        Ok(CacheValue::Opaque(serde_json::to_value(value)?))
    }

    /// Classify untyped JSON.
    ///
    /// A mapping whose `exchanges` field is a list is exchange-shaped; any
    /// other value is opaque. Either way the value itself is what gets stored.
    pub fn from_json(value: Value) -> Self {
        let is_shaped = match value.get(EXCHANGES_FIELD) {
            Some(Value::Array(_)) => true,
            Some(_) => {
                tracing::warn!("`{EXCHANGES_FIELD}` is not a list, storing value as opaque");
                false
            }
            None => false,
        };

        if !is_shaped {
            return CacheValue::Opaque(value);
        }

        match ExtractionResult::deserialize(&value) {
            Ok(result) => CacheValue::Exchanges { result, source: Some(value) },
            Err(e) => {
                tracing::warn!(error = %e, "exchange-shaped value failed to decode, storing as opaque");
                CacheValue::Opaque(value)
            }
        }
    }

    pub(crate) fn encode(&self) -> Result<String, Error> {
        let encoded = match self {
            CacheValue::Opaque(value) | CacheValue::Exchanges { source: Some(value), .. } => {
                serde_json::to_string(value)?
            }
            CacheValue::Exchanges { result, source: None } => serde_json::to_string(result)?,
        };
        Ok(encoded)
    }
}

impl From<ExtractionResult> for CacheValue {
    fn from(result: ExtractionResult) -> Self {
        CacheValue::Exchanges { result, source: None }
    }
}

/// Rows written by one projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Projection {
    pub exchanges: usize,
    pub messages: usize,
}

/// Replace the relational projection of `cache_key` inside `tx`.
///
/// Opaque values leave the key's rows untouched. For an exchange-shaped
/// value, prior exchanges for the key are removed first (cascading to their
/// messages), so a rewrite never leaves rows from an earlier value behind.
/// Malformed items are skipped individually with a warning; they keep their
/// position, so indices follow the original list.
pub(crate) fn replace_projection(tx: &Transaction<'_>, cache_key: &str, value: &CacheValue) -> Result<Projection, Error> {
    let CacheValue::Exchanges { result, .. } = value else {
        return Ok(Projection::default());
    };

    let cleared = tx.execute("DELETE FROM exchanges WHERE cache_key = ?1", params![cache_key])?;
    if cleared > 0 {
        tracing::debug!(cache_key, cleared, "cleared previous projection");
    }

    let mut projection = Projection::default();
    let mut insert_exchange = tx.prepare_cached("INSERT INTO exchanges (cache_key, exchange_index) VALUES (?1, ?2)")?;
    let mut insert_message = tx.prepare_cached(
        "INSERT INTO messages (exchange_id, message_index_in_exchange, date, time, person, quote)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;

    for (exchange_index, entry) in result.exchanges.iter().enumerate() {
        let ExchangeEntry::Messages(items) = entry else {
            tracing::warn!(cache_key, exchange_index, "exchange is not a list, skipping");
            continue;
        };

        insert_exchange.execute(params![cache_key, exchange_index as i64])?;
        let exchange_id = tx.last_insert_rowid();
        projection.exchanges += 1;

        for (message_index, item) in items.iter().enumerate() {
            let MessageEntry::Record(message) = item else {
                tracing::warn!(cache_key, exchange_index, message_index, "message is not a mapping, skipping");
                continue;
            };

            insert_message.execute(params![
                exchange_id,
                message_index as i64,
                &message.date,
                &message.time,
                &message.person,
                &message.quote,
            ])?;
            projection.messages += 1;
        }
    }

    tracing::debug!(cache_key, exchanges = projection.exchanges, messages = projection.messages, "projected exchanges");
    Ok(projection)
}
