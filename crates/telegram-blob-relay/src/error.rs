//! Error types for the blob relay

use std::fmt;

#[derive(Debug)]
pub enum RelayError {
    /// Payload exceeds the configured limit; raised before any network I/O.
    PayloadTooLarge { size: u64, limit: u64 },
    /// The platform rejected an upload (size, rate limit, bad request).
    RelayFailure(String),
    /// The platform no longer knows the reference. Treated as permanent.
    ReferenceNotFound(String),
    /// Transient condition; the caller may retry with backoff.
    RelayUnavailable(String),
    Http(Box<reqwest::Error>),
}

impl RelayError {
    /// Whether retrying the same call later could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            RelayError::RelayUnavailable(_) => true,
            RelayError::Http(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            _ => false,
        }
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayError::PayloadTooLarge { size, limit } => {
                write!(f, "Payload too large: {} bytes exceeds limit of {} bytes", size, limit)
            }
            RelayError::RelayFailure(msg) => write!(f, "Relay failure: {}", msg),
            RelayError::ReferenceNotFound(msg) => write!(f, "Reference not found: {}", msg),
            RelayError::RelayUnavailable(msg) => write!(f, "Relay unavailable: {}", msg),
            RelayError::Http(err) => write!(f, "HTTP error: {}", err),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Http(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        RelayError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
