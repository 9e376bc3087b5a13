//! Error types for the file bed server

use std::fmt;

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use telegram_blob_relay::RelayError;

/// Start-up and wiring errors
#[derive(Debug)]
pub enum ServerError {
    Config(String),
    Database(Box<sqlx::Error>),
    Relay(Box<RelayError>),
    Http(Box<reqwest::Error>),
    /// A third-party service answered with an error status
    Upstream(String),
    Io(Box<std::io::Error>),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            ServerError::Database(err) => write!(f, "Database error: {}", err),
            ServerError::Relay(err) => write!(f, "Relay error: {}", err),
            ServerError::Http(err) => write!(f, "HTTP client error: {}", err),
            ServerError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            ServerError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerError::Database(err) => Some(err.as_ref()),
            ServerError::Relay(err) => Some(err.as_ref()),
            ServerError::Http(err) => Some(err.as_ref()),
            ServerError::Io(err) => Some(err.as_ref()),
            ServerError::Config(_) | ServerError::Upstream(_) => None,
        }
    }
}

impl From<sqlx::Error> for ServerError {
    fn from(err: sqlx::Error) -> Self {
        ServerError::Database(Box::new(err))
    }
}

impl From<RelayError> for ServerError {
    fn from(err: RelayError) -> Self {
        ServerError::Relay(Box::new(err))
    }
}

impl From<reqwest::Error> for ServerError {
    fn from(err: reqwest::Error) -> Self {
        ServerError::Http(Box::new(err))
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        ServerError::Io(Box::new(err))
    }
}

impl From<tracing_subscriber::filter::ParseError> for ServerError {
    fn from(err: tracing_subscriber::filter::ParseError) -> Self {
        ServerError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Outcome of a failed ingest
#[derive(Debug)]
pub enum UploadError {
    EmptyUpload,
    /// `size` is unknown when the body was cut off by the transport limit
    PayloadTooLarge { size: Option<u64>, limit: u64 },
    InvalidForm(String),
    /// The relay rejected the upload; no record was written
    UploadFailed(String),
    /// The blob was stored but the record could not be written
    RecordFailed(String),
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadError::EmptyUpload => write!(f, "Uploaded file is empty"),
            UploadError::PayloadTooLarge { limit, .. } => {
                write!(f, "File exceeds the {} MB limit", limit / (1024 * 1024))
            }
            UploadError::InvalidForm(msg) => write!(f, "Invalid upload form: {}", msg),
            UploadError::UploadFailed(msg) => write!(f, "Upload failed: {}", msg),
            UploadError::RecordFailed(msg) => write!(f, "Failed to record upload: {}", msg),
        }
    }
}

impl std::error::Error for UploadError {}

/// Outcome of a failed key resolution
#[derive(Debug)]
pub enum ResolveError {
    /// No record for the key
    NotFound,
    /// The record exists but the blob store no longer knows its reference
    ReferenceNotFound(String),
    /// Any other blob store failure
    Upstream { retryable: bool, reason: String },
    Database(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound => write!(f, "Not found"),
            ResolveError::ReferenceNotFound(msg) => {
                write!(f, "Blob reference missing upstream: {}", msg)
            }
            ResolveError::Upstream { reason, .. } => write!(f, "Upstream error: {}", reason),
            ResolveError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Seconds a client should wait before retrying a transient upstream failure
const RETRY_AFTER_SECS: &str = "5";

/// Media reads fail with an empty body
impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        match self {
            ResolveError::NotFound => StatusCode::NOT_FOUND.into_response(),
            ResolveError::Upstream {
                retryable: true, ..
            } => (
                StatusCode::SERVICE_UNAVAILABLE,
                [(header::RETRY_AFTER, RETRY_AFTER_SECS)],
            )
                .into_response(),
            ResolveError::ReferenceNotFound(_) | ResolveError::Upstream { .. } => {
                StatusCode::BAD_GATEWAY.into_response()
            }
            ResolveError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// HTTP boundary error with a JSON body
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized,
    PayloadTooLarge(String),
    BadGateway(String),
    Internal(String),
    Database(sqlx::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized => {
                return (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, "Basic realm=\"Admin\"")],
                    "Unauthorized",
                )
                    .into_response();
            }
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            AppError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".into(),
                )
            }
        };

        (status, axum::Json(json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl From<UploadError> for AppError {
    fn from(e: UploadError) -> Self {
        let message = e.to_string();
        match e {
            UploadError::EmptyUpload | UploadError::InvalidForm(_) => AppError::BadRequest(message),
            UploadError::PayloadTooLarge { .. } => AppError::PayloadTooLarge(message),
            UploadError::UploadFailed(_) => AppError::BadGateway(message),
            UploadError::RecordFailed(_) => AppError::Internal(message),
        }
    }
}
