//! Edge response cache
//!
//! Caches fully built responses keyed by request URL. Each entry expires
//! after the TTL of its content class; deletes purge entries best-effort.

mod cache;
mod error;
mod types;

pub use cache::ResponseCache;
pub use error::CacheError;
pub use types::{CacheStats, CachedResponse, ContentClass, TtlPolicy};
