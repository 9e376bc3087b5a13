//! In-process relay for local development and tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tokio::sync::{Mutex, RwLock};

use crate::error::{RelayError, Result};
use crate::relay::{AdminNotifier, BlobRelay};
use crate::types::FetchLocation;

const MEMORY_SCHEME: &str = "memory://";

/// A relay that keeps blobs in memory.
///
/// Nothing survives a restart. Failure injection hooks let callers simulate
/// platform rejections and revoked references.
pub struct MemoryRelay {
    blobs: RwLock<HashMap<String, Bytes>>,
    max_payload: u64,
    next_id: AtomicU64,
    store_calls: AtomicUsize,
    fail_next_store: Mutex<Option<String>>,
    notifications: Mutex<Vec<String>>,
}

impl MemoryRelay {
    pub fn new(max_payload: u64) -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
            max_payload,
            next_id: AtomicU64::new(1),
            store_calls: AtomicUsize::new(0),
            fail_next_store: Mutex::new(None),
            notifications: Mutex::new(Vec::new()),
        }
    }

    /// Number of `store` calls received, including rejected ones
    pub fn store_calls(&self) -> usize {
        self.store_calls.load(Ordering::Relaxed)
    }

    /// Make the next `store` fail with `RelayFailure(diagnostic)`
    pub async fn fail_next_store(&self, diagnostic: &str) {
        *self.fail_next_store.lock().await = Some(diagnostic.to_string());
    }

    /// Drop a blob so later resolution reports `ReferenceNotFound`
    pub async fn revoke(&self, blob_ref: &str) -> bool {
        self.blobs.write().await.remove(blob_ref).is_some()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Messages passed to [`AdminNotifier::notify`]
    pub async fn notifications(&self) -> Vec<String> {
        self.notifications.lock().await.clone()
    }
}

impl Default for MemoryRelay {
    fn default() -> Self {
        Self::new(u64::MAX)
    }
}

#[async_trait]
impl BlobRelay for MemoryRelay {
    async fn store(&self, bytes: Bytes, _content_type: &str, _filename: &str) -> Result<String> {
        self.store_calls.fetch_add(1, Ordering::Relaxed);

        let size = bytes.len() as u64;
        if size > self.max_payload {
            return Err(RelayError::PayloadTooLarge {
                size,
                limit: self.max_payload,
            });
        }

        if let Some(diagnostic) = self.fail_next_store.lock().await.take() {
            return Err(RelayError::RelayFailure(diagnostic));
        }

        let blob_ref = format!("mem-{}", self.next_id.fetch_add(1, Ordering::Relaxed));
        self.blobs.write().await.insert(blob_ref.clone(), bytes);
        Ok(blob_ref)
    }

    async fn resolve(&self, blob_ref: &str) -> Result<FetchLocation> {
        if !self.blobs.read().await.contains_key(blob_ref) {
            return Err(RelayError::ReferenceNotFound(format!(
                "unknown reference {}",
                blob_ref
            )));
        }

        Ok(FetchLocation {
            url: format!("{}{}", MEMORY_SCHEME, blob_ref),
            expires_at: Utc::now() + chrono::Duration::minutes(5),
        })
    }

    async fn fetch(&self, location: &FetchLocation) -> Result<Bytes> {
        let blob_ref = location.url.strip_prefix(MEMORY_SCHEME).ok_or_else(|| {
            RelayError::RelayUnavailable(format!("not a memory location: {}", location.url))
        })?;

        self.blobs
            .read()
            .await
            .get(blob_ref)
            .cloned()
            .ok_or_else(|| RelayError::ReferenceNotFound(blob_ref.to_string()))
    }
}

#[async_trait]
impl AdminNotifier for MemoryRelay {
    async fn notify(&self, text: &str) -> Result<()> {
        self.notifications.lock().await.push(text.to_string());
        Ok(())
    }
}
