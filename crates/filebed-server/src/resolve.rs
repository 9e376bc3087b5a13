//! Key resolution: index lookup, reference re-resolution, fetch

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use edge_response_cache::TtlPolicy;
use filebed_db::{media, SqlitePool};
use telegram_blob_relay::{BlobRelay, MediaKind, RelayError};
use tracing::{debug, error, warn};

use crate::error::ResolveError;

/// Bytes ready to be served for a key
#[derive(Debug, Clone)]
pub struct ResolvedMedia {
    pub key: String,
    /// From the record, never from the upstream download
    pub content_type: String,
    pub max_age_secs: u64,
    pub body: Bytes,
}

pub struct ResolveProxy {
    pool: SqlitePool,
    relay: Arc<dyn BlobRelay>,
    relay_timeout: Duration,
    ttl: TtlPolicy,
}

impl ResolveProxy {
    pub fn new(
        pool: SqlitePool,
        relay: Arc<dyn BlobRelay>,
        relay_timeout: Duration,
        ttl: TtlPolicy,
    ) -> Self {
        Self {
            pool,
            relay,
            relay_timeout,
            ttl,
        }
    }

    /// Look the key up, re-resolve its blob reference and download the bytes.
    ///
    /// Each upstream step is bounded by the relay timeout. Nothing is retried.
    pub async fn resolve(&self, key: &str) -> Result<ResolvedMedia, ResolveError> {
        let row = media::get(&self.pool, key)
            .await
            .map_err(|e| ResolveError::Database(e.to_string()))?
            .ok_or(ResolveError::NotFound)?;

        let location = self
            .bounded("resolve", key, self.relay.resolve(&row.blob_ref))
            .await?;
        debug!(key, expires_at = %location.expires_at, "Resolved fetch location");

        let body = self.bounded("fetch", key, self.relay.fetch(&location)).await?;

        let visual = MediaKind::of(&row.content_type).is_visual();
        Ok(ResolvedMedia {
            key: row.key,
            content_type: row.content_type,
            max_age_secs: self.ttl.for_media(visual),
            body,
        })
    }

    async fn bounded<T, F>(&self, step: &str, key: &str, call: F) -> Result<T, ResolveError>
    where
        F: Future<Output = telegram_blob_relay::Result<T>>,
    {
        match tokio::time::timeout(self.relay_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(RelayError::ReferenceNotFound(reason))) => {
                error!(
                    key,
                    step,
                    reason = %reason,
                    "Record exists but blob store does not know its reference"
                );
                Err(ResolveError::ReferenceNotFound(reason))
            }
            Ok(Err(e)) => {
                warn!(key, step, error = %e, "Blob relay error");
                Err(ResolveError::Upstream {
                    retryable: e.is_retryable(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                warn!(key, step, timeout_secs = self.relay_timeout.as_secs(), "Blob relay timed out");
                Err(ResolveError::Upstream {
                    retryable: true,
                    reason: format!("blob {} timed out", step),
                })
            }
        }
    }
}
