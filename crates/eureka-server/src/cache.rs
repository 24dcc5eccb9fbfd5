/// Result cache for recommendation sets.
///
/// Key schema:
/// - `eureka-cache-{sha256(query fields)}`: versioned `CacheEntry { data, timestamp }`
///
/// Entries live for 30 minutes. Expiry is lazy: a read past the window deletes the entry
/// and reports a miss. Nothing sweeps the store in the background.
use std::sync::Arc;
use std::time::Duration;

use eureka_core::store::{Record, Repository};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::model::{RecommendationSet, SearchQuery};

pub const KEY_PREFIX: &str = "eureka-cache-";
pub const CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: RecommendationSet,
    /// Epoch milliseconds at write time.
    pub timestamp: i64,
}

impl Record for CacheEntry {
    const SCHEMA_VERSION: u32 = 1;
}

/// Deterministic key for `query`: SHA-256 over the field values in the fixed order
/// use case, budget, category, platform, privacy, additional.
pub fn cache_key(query: &SearchQuery) -> String {
    let mut hasher = Sha256::new();
    for field in [
        query.use_case.as_str(),
        query.budget.as_str(),
        query.category.as_str(),
        query.platform.as_str(),
        query.privacy.as_str(),
        query.additional.as_deref().unwrap_or_default(),
    ] {
        hasher.update(field.as_bytes());
        hasher.update(b"|");
    }
    format!("{:x}", hasher.finalize())
}

pub struct ResultCache {
    repo: Repository,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(repo: Repository, clock: Arc<dyn Clock>) -> Self {
        Self {
            repo,
            clock,
            ttl: CACHE_TTL,
        }
    }

    pub async fn get(&self, key: &str) -> Option<RecommendationSet> {
        let storage_key = storage_key(key);
        let Some(entry) = self.repo.get::<CacheEntry>(&storage_key).await else {
            // Absent and unreadable entries both land here; deleting an absent key is a no-op.
            self.repo.delete(&storage_key).await;
            return None;
        };
        let age_ms = self.clock.now_millis().saturating_sub(entry.timestamp);
        if age_ms > self.ttl.as_millis() as i64 {
            debug!(key, age_ms, "cache entry expired");
            self.repo.delete(&storage_key).await;
            return None;
        }
        Some(entry.data)
    }

    pub async fn set(&self, key: &str, data: &RecommendationSet) {
        let entry = CacheEntry {
            data: data.clone(),
            timestamp: self.clock.now_millis(),
        };
        if !self.repo.set(&storage_key(key), &entry).await {
            warn!(key, "failed to store recommendations in cache");
        }
    }
}

fn storage_key(key: &str) -> String {
    format!("{KEY_PREFIX}{key}")
}
