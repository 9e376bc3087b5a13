//! The relay seam used by ingest and resolution

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::types::FetchLocation;

/// A write-once, read-many blob store backed by an external platform
#[async_trait]
pub trait BlobRelay: Send + Sync {
    /// Upload `bytes` and return the opaque reference the platform issued.
    ///
    /// Fails with `PayloadTooLarge` before any network I/O when the payload
    /// exceeds the configured limit. Never retries.
    async fn store(&self, bytes: Bytes, content_type: &str, filename: &str) -> Result<String>;

    /// Exchange a stored reference for a short-lived fetch location.
    ///
    /// Must be called on every read; previously returned locations may
    /// already be invalid.
    async fn resolve(&self, blob_ref: &str) -> Result<FetchLocation>;

    /// Download the bytes behind a resolved location
    async fn fetch(&self, location: &FetchLocation) -> Result<Bytes>;
}

/// Out-of-band message to the deployment owner
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<()>;
}
