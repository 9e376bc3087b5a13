//! Cache types

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Response grouping used to pick a TTL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentClass {
    /// Landing page; static per deployment
    Html,
    /// Stored objects; immutable once ingested
    Media,
    /// JSON shaped data that changes often
    Api,
}

/// TTLs in seconds per content class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TtlPolicy {
    pub html_secs: u64,
    pub media_secs: u64,
    pub api_secs: u64,
    /// Media objects that are neither images nor videos
    pub default_secs: u64,
}

impl TtlPolicy {
    pub fn for_class(&self, class: ContentClass) -> u64 {
        match class {
            ContentClass::Html => self.html_secs,
            ContentClass::Media => self.media_secs,
            ContentClass::Api => self.api_secs,
        }
    }

    /// TTL for a stored object; only images and videos get the long TTL
    pub fn for_media(&self, visual: bool) -> u64 {
        if visual {
            self.media_secs
        } else {
            self.default_secs
        }
    }
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            html_secs: 3600,
            media_secs: 86400,
            api_secs: 300,
            default_secs: 3600,
        }
    }
}

/// A response body with the headers needed to replay it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    pub class: ContentClass,
    pub content_type: String,
    pub max_age_secs: u64,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(class: ContentClass, content_type: &str, max_age_secs: u64, body: Bytes) -> Self {
        Self {
            class,
            content_type: content_type.to_string(),
            max_age_secs,
            body,
        }
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }

    /// Value for `Cache-Control` and `CDN-Cache-Control`
    pub fn cache_control(&self) -> String {
        format!("public, max-age={}", self.max_age_secs)
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub weighted_size: u64,
    pub hits: u64,
    pub misses: u64,
}
