//! SQLite-backed result cache with a relational exchange projection.
//!
//! Raw entries are content-addressed by a SHA-256 key. Exchange-shaped
//! values are additionally normalized into `exchanges` and `messages` rows
//! that can be listed, edited and merged without touching the raw payload.
//!
//! - Schema migrations behind a one-time lifecycle gate
//! - WAL mode with foreign-key cascades
//! - One transaction per multi-step write

pub mod connection;
pub mod entries;
pub mod exchanges;
mod finite;
pub mod hash;
pub mod migrations;
pub mod mutations;
pub mod normalize;

pub use crate::Error;

pub use connection::{CacheDb, LifecycleState};
pub use entries::EXTRACTION_ORIGIN;
pub use exchanges::{
    ExchangeDetail, ExchangePage, ExchangeSummary, MAX_PAGE_SIZE, Message, Pagination, ProjectedMessage, SortOrder,
};
pub use hash::compute_cache_key;
pub use mutations::message_timestamp;
pub use normalize::{CacheValue, ExchangeEntry, ExtractionResult, MessageEntry, MessageRecord};
