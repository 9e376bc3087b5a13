//! Cache error types

use std::fmt;

#[derive(Debug)]
pub enum CacheError {
    /// A purge could not be scheduled; stale entries live until their TTL
    Purge(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Purge(msg) => write!(f, "Cache purge failed: {}", msg),
        }
    }
}

impl std::error::Error for CacheError {}
