//! Upload ingestion: validate, relay, record

use std::sync::Arc;

use bytes::Bytes;
use filebed_db::{media, NewMedia, SqlitePool};
use telegram_blob_relay::{content_type_for, extension_of, AdminNotifier, BlobRelay, RelayError};
use tracing::{debug, error, info, warn};

use crate::error::UploadError;
use crate::keys::{compose_key, KeyGenerator};

/// Attempts at finding a free key before giving up
const MAX_KEY_ATTEMPTS: usize = 5;

/// A file received from a client
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Bytes,
    pub filename: String,
    pub declared_content_type: Option<String>,
}

/// A successfully ingested file
#[derive(Debug, Clone)]
pub struct Ingested {
    pub key: String,
    pub url: String,
    pub content_type: String,
}

pub struct IngestPipeline {
    pool: SqlitePool,
    relay: Arc<dyn BlobRelay>,
    notifier: Option<Arc<dyn AdminNotifier>>,
    keys: KeyGenerator,
    origin: String,
    max_upload_bytes: u64,
}

impl IngestPipeline {
    pub fn new(
        pool: SqlitePool,
        relay: Arc<dyn BlobRelay>,
        notifier: Option<Arc<dyn AdminNotifier>>,
        keys: KeyGenerator,
        origin: &str,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            pool,
            relay,
            notifier,
            keys,
            origin: origin.to_string(),
            max_upload_bytes,
        }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Store the bytes with the relay, then record the key.
    ///
    /// A relay failure leaves no record behind. A record failure after a
    /// successful store leaves an orphaned blob, which is logged and not
    /// reconciled here.
    pub async fn ingest(&self, upload: Upload) -> Result<Ingested, UploadError> {
        let size = upload.bytes.len() as u64;
        if size == 0 {
            return Err(UploadError::EmptyUpload);
        }
        if size > self.max_upload_bytes {
            return Err(UploadError::PayloadTooLarge {
                size: Some(size),
                limit: self.max_upload_bytes,
            });
        }

        let extension = extension_of(&upload.filename);
        let content_type = content_type_for(&extension);
        debug!(
            filename = %upload.filename,
            declared = upload.declared_content_type.as_deref().unwrap_or("-"),
            content_type,
            size,
            "Ingesting upload"
        );

        let blob_ref = self
            .relay
            .store(upload.bytes, content_type, &upload.filename)
            .await
            .map_err(|e| {
                warn!(filename = %upload.filename, error = %e, "Relay rejected upload");
                match e {
                    RelayError::PayloadTooLarge { size, limit } => UploadError::PayloadTooLarge {
                        size: Some(size),
                        limit,
                    },
                    other => UploadError::UploadFailed(other.to_string()),
                }
            })?;

        let key = self
            .record(&blob_ref, content_type, &extension, size)
            .await?;

        let url = format!("{}/{}", self.origin, key);
        info!(key = %key, size, content_type, "Upload stored");
        self.notify(&url);

        Ok(Ingested {
            key,
            url,
            content_type: content_type.to_string(),
        })
    }

    async fn record(
        &self,
        blob_ref: &str,
        content_type: &str,
        extension: &str,
        size: u64,
    ) -> Result<String, UploadError> {
        for _ in 0..MAX_KEY_ATTEMPTS {
            let created_at = self.keys.next_timestamp();
            let row = NewMedia {
                key: compose_key(created_at, extension),
                blob_ref: blob_ref.to_string(),
                content_type: content_type.to_string(),
                extension: extension.to_string(),
                size_bytes: i64::try_from(size).unwrap_or(i64::MAX),
                created_at,
            };

            match media::insert(&self.pool, &row).await {
                Ok(()) => return Ok(row.key),
                Err(e) if media::is_unique_violation(&e) => {
                    debug!(key = %row.key, "Key taken, retrying with next timestamp");
                }
                Err(e) => {
                    error!(
                        blob_ref,
                        key = %row.key,
                        error = %e,
                        "Orphaned blob: stored upstream but record write failed"
                    );
                    return Err(UploadError::RecordFailed(e.to_string()));
                }
            }
        }

        error!(
            blob_ref,
            attempts = MAX_KEY_ATTEMPTS,
            "Orphaned blob: no free key found"
        );
        Err(UploadError::RecordFailed("no free key available".to_string()))
    }

    /// Fire-and-forget; failures are swallowed
    fn notify(&self, url: &str) {
        let Some(notifier) = self.notifier.clone() else {
            return;
        };
        let text = format!("New upload: {}", url);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&text).await {
                debug!(error = %e, "Admin notification failed");
            }
        });
    }
}
