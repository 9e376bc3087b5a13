//! Telegram Bot API relay

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{RelayError, Result};
use crate::media_type::UploadMethod;
use crate::relay::{AdminNotifier, BlobRelay};
use crate::types::{ApiResponse, FetchLocation, Message, TelegramFile};

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Telegram guarantees a `getFile` download link for at least an hour
const FETCH_LINK_VALIDITY_SECS: i64 = 60 * 60;

/// Relay that stores blobs as messages in a Telegram chat
pub struct TelegramRelay {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
    max_payload: u64,
}

impl TelegramRelay {
    /// Create a relay against the public Bot API
    pub fn new(token: &str, chat_id: &str, max_payload: u64, timeout: Duration) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, token, chat_id, max_payload, timeout)
    }

    /// Create a relay against a custom Bot API server
    pub fn with_base_url(
        base_url: &str,
        token: &str,
        chat_id: &str,
        max_payload: u64,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            chat_id: chat_id.to_string(),
            max_payload,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.base_url, self.token, file_path)
    }
}

/// Read a Bot API envelope, tolerating non-JSON bodies from proxies
async fn read_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> std::result::Result<(StatusCode, ApiResponse<T>), String> {
    let status = response.status();
    let body = response.text().await.map_err(|e| e.to_string())?;

    serde_json::from_str::<ApiResponse<T>>(&body)
        .map(|envelope| (status, envelope))
        .map_err(|_| {
            let snippet: String = body.chars().take(200).collect();
            format!("status {}: {}", status, snippet)
        })
}

/// Classify a failed `getFile` answer
fn classify_resolve_failure(status: StatusCode, envelope: &ApiResponse<TelegramFile>) -> RelayError {
    let diagnostic = envelope.diagnostic();
    let code = envelope.error_code.unwrap_or(status.as_u16());

    match code {
        400 if diagnostic.contains("file is too big") => RelayError::RelayFailure(diagnostic),
        400 | 404 => RelayError::ReferenceNotFound(diagnostic),
        _ => RelayError::RelayUnavailable(diagnostic),
    }
}

#[async_trait]
impl BlobRelay for TelegramRelay {
    async fn store(&self, bytes: Bytes, content_type: &str, filename: &str) -> Result<String> {
        let size = bytes.len() as u64;
        if size > self.max_payload {
            return Err(RelayError::PayloadTooLarge {
                size,
                limit: self.max_payload,
            });
        }

        let method = UploadMethod::select(content_type, size);
        debug!(method = method.api_method(), size, filename, "Uploading blob");

        let part = Part::stream_with_length(reqwest::Body::from(bytes), size)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| RelayError::RelayFailure(e.to_string()))?;
        let form = Form::new()
            .text("chat_id", self.chat_id.clone())
            .part(method.field_name(), part);

        let response = self
            .client
            .post(self.method_url(method.api_method()))
            .multipart(form)
            .send()
            .await
            .map_err(|e| RelayError::RelayFailure(e.without_url().to_string()))?;

        let (_, envelope) = read_envelope::<Message>(response)
            .await
            .map_err(RelayError::RelayFailure)?;

        if !envelope.ok {
            let diagnostic = envelope.diagnostic();
            warn!(method = method.api_method(), error = %diagnostic, "Upload rejected");
            return Err(RelayError::RelayFailure(diagnostic));
        }

        let message = envelope
            .result
            .ok_or_else(|| RelayError::RelayFailure("response carried no message".to_string()))?;

        let file_id = message.file_id(method).ok_or_else(|| {
            RelayError::RelayFailure("response carried no file reference".to_string())
        })?;

        debug!(message_id = message.message_id, "Stored blob");
        Ok(file_id.to_string())
    }

    async fn resolve(&self, blob_ref: &str) -> Result<FetchLocation> {
        let url = format!(
            "{}?file_id={}",
            self.method_url("getFile"),
            urlencoding::encode(blob_ref)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| RelayError::RelayUnavailable(e.without_url().to_string()))?;

        let (status, envelope) = read_envelope::<TelegramFile>(response)
            .await
            .map_err(RelayError::RelayUnavailable)?;

        if !envelope.ok {
            return Err(classify_resolve_failure(status, &envelope));
        }

        let file_path = envelope
            .result
            .and_then(|file| file.file_path)
            .ok_or_else(|| {
                RelayError::ReferenceNotFound("getFile returned no file_path".to_string())
            })?;

        debug!(file_path = %file_path, "Resolved blob reference");

        Ok(FetchLocation {
            url: self.file_url(&file_path),
            expires_at: Utc::now() + chrono::Duration::seconds(FETCH_LINK_VALIDITY_SECS),
        })
    }

    async fn fetch(&self, location: &FetchLocation) -> Result<Bytes> {
        if location.expires_at <= Utc::now() {
            return Err(RelayError::RelayUnavailable(
                "fetch location expired".to_string(),
            ));
        }

        let response = self
            .client
            .get(&location.url)
            .send()
            .await
            .map_err(|e| RelayError::RelayUnavailable(e.without_url().to_string()))?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "Blob download failed");
            return Err(RelayError::RelayUnavailable(format!(
                "file download returned status {}",
                response.status()
            )));
        }

        response
            .bytes()
            .await
            .map_err(|e| RelayError::RelayUnavailable(e.without_url().to_string()))
    }
}

#[async_trait]
impl AdminNotifier for TelegramRelay {
    async fn notify(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({
                "chat_id": self.chat_id,
                "text": text,
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .map_err(|e| RelayError::from(e.without_url()))?;

        let (_, envelope) = read_envelope::<serde_json::Value>(response)
            .await
            .map_err(RelayError::RelayFailure)?;

        if envelope.ok {
            Ok(())
        } else {
            Err(RelayError::RelayFailure(envelope.diagnostic()))
        }
    }
}
