//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};

/// Compute a content-addressed cache key for a generation request.
///
/// `context` names the pipeline stage issuing the request, so the same
/// input sent through two stages never shares a key. An empty context is
/// the same as none.
pub fn compute_cache_key(hash_key: &str, context: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(hash_key.as_bytes());
    if let Some(context) = context.filter(|c| !c.is_empty()) {
        hasher.update(b"::");
        hasher.update(context.as_bytes());
    }
    hex::encode(hasher.finalize())
}
