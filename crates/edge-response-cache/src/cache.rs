//! Response cache backed by moka

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::future::Cache;
use moka::Expiry;
use tracing::debug;

use crate::error::CacheError;
use crate::types::{CacheStats, CachedResponse};

/// Expires each entry after its own `max_age_secs`
struct ResponseExpiry;

impl Expiry<String, CachedResponse> for ResponseExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedResponse,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl())
    }
}

/// How long a purged URL refuses new entries
const TOMBSTONE_TTL: Duration = Duration::from_secs(600);
const MAX_TOMBSTONES: u64 = 100_000;

/// A response cache keyed by full request URL
pub struct ResponseCache {
    entries: Cache<String, CachedResponse>,
    /// URLs purged recently; responses built before the purge must not land
    tombstones: Cache<String, ()>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl ResponseCache {
    /// Create a cache holding at most `max_bytes` of response bodies
    pub fn new(max_bytes: u64) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_bytes)
            .weigher(|key: &String, value: &CachedResponse| {
                u32::try_from(key.len() + value.body.len()).unwrap_or(u32::MAX)
            })
            .expire_after(ResponseExpiry)
            .support_invalidation_closures()
            .build();
        let tombstones = Cache::builder()
            .max_capacity(MAX_TOMBSTONES)
            .time_to_live(TOMBSTONE_TTL)
            .build();

        Self {
            entries,
            tombstones,
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Look up a response by URL
    pub async fn get(&self, url: &str) -> Option<CachedResponse> {
        match self.entries.get(url).await {
            Some(response) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(url, "Cache hit");
                Some(response)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a response; responses with a zero TTL are not kept.
    ///
    /// A URL purged within the last few minutes, or a query variant of
    /// one, is not stored either.
    pub async fn put(&self, url: &str, response: CachedResponse) {
        if response.max_age_secs == 0 || self.is_tombstoned(url) {
            return;
        }
        debug!(url, class = ?response.class, max_age = response.max_age_secs, "Cached response");
        self.entries.insert(url.to_string(), response).await;

        // A purge may have landed between the check and the insert
        if self.is_tombstoned(url) {
            self.entries.invalidate(url).await;
        }
    }

    fn is_tombstoned(&self, url: &str) -> bool {
        let base = url.split_once('?').map_or(url, |(base, _)| base);
        self.tombstones.contains_key(base)
    }

    /// Purge `url` and any query-string variants of it.
    ///
    /// The exact entry is removed immediately. Variants are purged by a
    /// predicate; if that cannot be registered they stay until their TTL.
    pub async fn invalidate(&self, url: &str) -> Result<(), CacheError> {
        self.tombstones.insert(url.to_string(), ()).await;
        self.entries.invalidate(url).await;

        let prefix = format!("{}?", url);
        self.entries
            .invalidate_entries_if(move |key, _| key.starts_with(&prefix))
            .map(|_| ())
            .map_err(|e| CacheError::Purge(e.to_string()))
    }

    /// Get current cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.entries.run_pending_tasks().await;
        CacheStats {
            entries: self.entries.entry_count(),
            weighted_size: self.entries.weighted_size(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
