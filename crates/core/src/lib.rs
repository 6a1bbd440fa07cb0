//! Core types and shared functionality for memento.
//!
//! This crate provides:
//! - Result cache with SQLite backend and exchange/message projection
//! - Query and mutation layers over the projection
//! - Transcript chunking and read-through generation
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod generate;
pub mod transcript;

pub use cache::{CacheDb, CacheValue, ExtractionResult, MessageRecord, SortOrder};
pub use config::AppConfig;
pub use error::Error;
pub use generate::{Fetched, Generator, ReadThrough};
pub use transcript::chunk_transcript_by_day;
