//! Read-through caching in front of an extraction generator.
//!
//! The generator itself (a model client, a fixture) lives outside this crate
//! behind the [`Generator`] trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use crate::Error;
use crate::cache::entries::EXTRACTION_ORIGIN;
use crate::cache::hash::compute_cache_key;
use crate::cache::normalize::{CacheValue, ExtractionResult};
use crate::cache::CacheDb;

/// Produces an extraction result for one prompt.
#[async_trait]
pub trait Generator: Send + Sync {
    /// # Errors
    ///
    /// Implementations report upstream failures as `Error::Generation`.
    async fn generate(&self, prompt: &str) -> Result<ExtractionResult, Error>;
}

/// Outcome of a read-through lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub cache_key: String,
    pub result: ExtractionResult,
    /// Whether the result was served from the cache.
    pub cached: bool,
}

/// Cache-first access to a [`Generator`] with bounded concurrency.
#[derive(Clone, Debug)]
pub struct ReadThrough {
    db: CacheDb,
    permits: Arc<Semaphore>,
}

impl ReadThrough {
    /// Allow at most `max_concurrent_generations` generator calls in flight.
    ///
    /// A limit of 0 is raised to 1.
    pub fn new(db: CacheDb, max_concurrent_generations: usize) -> Self {
        Self { db, permits: Arc::new(Semaphore::new(max_concurrent_generations.max(1))) }
    }

    /// Return the cached extraction for `hash_key`, generating it on a miss.
    ///
    /// A hit that no longer decodes as an extraction result is treated as a
    /// miss. Fresh results are written with [`EXTRACTION_ORIGIN`], so they
    /// are projected and recorded in the provenance index.
    ///
    /// # Errors
    ///
    /// Propagates storage and generator failures; a failed generation writes
    /// nothing.
    pub async fn get_or_generate<G>(&self, generator: &G, hash_key: &str, prompt: &str) -> Result<Fetched, Error>
    where
        G: Generator + ?Sized,
    {
        let cache_key = compute_cache_key(hash_key, Some(EXTRACTION_ORIGIN));

        if let Some(cached) = self.db.read(&cache_key).await? {
            match serde_json::from_value::<ExtractionResult>(cached) {
                Ok(result) => {
                    tracing::debug!(cache_key = %cache_key, hash_key, "serving extraction from cache");
                    return Ok(Fetched { cache_key, result, cached: true });
                }
                Err(e) => {
                    tracing::warn!(cache_key = %cache_key, hash_key, error = %e, "cached extraction is undecodable, regenerating");
                }
            }
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::Generation(format!("generation pool closed: {e}")))?;

        tracing::debug!(cache_key = %cache_key, hash_key, "generating extraction");
        let result = generator.generate(prompt).await.inspect_err(|e| {
            tracing::error!(cache_key = %cache_key, hash_key, error = %e, "generation failed");
        })?;

        self.db
            .write(&cache_key, &CacheValue::from(result.clone()), Some(EXTRACTION_ORIGIN))
            .await?;

        tracing::info!(cache_key = %cache_key, hash_key, messages = result.message_count(), "cached fresh extraction");
        Ok(Fetched { cache_key, result, cached: false })
    }
}
