//! Bot API wire types and relay outputs

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::media_type::UploadMethod;

/// A short-lived location the blob bytes can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchLocation {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Envelope every Bot API method answers with
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<u16>,
    pub parameters: Option<ResponseParameters>,
}

impl<T> ApiResponse<T> {
    /// Human readable diagnostic for a failed call
    pub fn diagnostic(&self) -> String {
        let mut text = self
            .description
            .clone()
            .unwrap_or_else(|| "unknown error".to_string());
        if let Some(code) = self.error_code {
            text = format!("{} (error_code {})", text, code);
        }
        if let Some(secs) = self.parameters.as_ref().and_then(|p| p.retry_after) {
            text = format!("{}, retry after {}s", text, secs);
        }
        text
    }
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

/// The subset of a sent message needed to recover the file reference
#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub photo: Option<Vec<PhotoSize>>,
    pub animation: Option<FileRef>,
    pub video: Option<FileRef>,
    pub document: Option<FileRef>,
}

impl Message {
    /// File id for the uploaded payload.
    ///
    /// Looks at the field matching `method` first, then any other file field.
    /// For photos the largest rendition is used.
    pub fn file_id(&self, method: UploadMethod) -> Option<&str> {
        let largest_photo = || {
            self.photo.as_ref().and_then(|sizes| {
                sizes
                    .iter()
                    .max_by_key(|p| (p.file_size.unwrap_or(0), p.width * p.height))
                    .map(|p| p.file_id.as_str())
            })
        };
        let animation = || self.animation.as_ref().map(|f| f.file_id.as_str());
        let video = || self.video.as_ref().map(|f| f.file_id.as_str());
        let document = || self.document.as_ref().map(|f| f.file_id.as_str());

        let preferred = match method {
            UploadMethod::Photo => largest_photo(),
            UploadMethod::Animation => animation(),
            UploadMethod::Video => video(),
            UploadMethod::Document => document(),
        };

        preferred
            .or_else(document)
            .or_else(video)
            .or_else(animation)
            .or_else(largest_photo)
    }
}

#[derive(Debug, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub file_size: Option<u64>,
    #[serde(default)]
    pub width: u64,
    #[serde(default)]
    pub height: u64,
}

#[derive(Debug, Deserialize)]
pub struct FileRef {
    pub file_id: String,
    pub file_size: Option<u64>,
}

/// Answer to `getFile`
#[derive(Debug, Deserialize)]
pub struct TelegramFile {
    pub file_id: String,
    pub file_size: Option<u64>,
    pub file_path: Option<String>,
}
