use std::sync::Arc;

use chrono::{DateTime, Utc};
use edge_response_cache::ResponseCache;
use filebed_db::SqlitePool;
use telegram_blob_relay::{AdminNotifier, BlobRelay};

use crate::background::BackgroundImages;
use crate::config::Config;
use crate::error::Result;
use crate::gallery::GalleryAdmin;
use crate::ingest::IngestPipeline;
use crate::keys::{Clock, KeyGenerator};
use crate::resolve::ResolveProxy;

/// Shared application state passed to all route handlers
pub struct AppState {
    pub config: Arc<Config>,
    pub pool: SqlitePool,
    pub cache: Arc<ResponseCache>,
    pub ingest: IngestPipeline,
    pub resolver: ResolveProxy,
    pub gallery: GalleryAdmin,
    pub backgrounds: BackgroundImages,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the components together; `notifier` is only used when uploads should be announced
    pub fn new(
        config: Config,
        pool: SqlitePool,
        relay: Arc<dyn BlobRelay>,
        notifier: Option<Arc<dyn AdminNotifier>>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let cache = Arc::new(ResponseCache::new(config.cache_max_bytes));
        let notifier = notifier.filter(|_| config.notify_uploads);

        let ingest = IngestPipeline::new(
            pool.clone(),
            relay.clone(),
            notifier,
            KeyGenerator::new(clock),
            &config.origin,
            config.max_upload_bytes,
        );
        let resolver = ResolveProxy::new(pool.clone(), relay, config.relay_timeout, config.ttl);
        let gallery = GalleryAdmin::new(pool.clone(), cache.clone(), &config.origin);
        let backgrounds = BackgroundImages::new(&config.background_base_url, config.relay_timeout)?;

        Ok(Self {
            config,
            pool,
            cache,
            ingest,
            resolver,
            gallery,
            backgrounds,
            started_at: Utc::now(),
        })
    }
}
