//! Extension to MIME mapping and upload method selection

/// Fallback for any extension not in the table
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Extension used when a filename carries no usable extension
pub const DEFAULT_EXTENSION: &str = "bin";

const MAX_EXTENSION_LEN: usize = 10;

const PHOTO_LIMIT_BYTES: u64 = 10 * 1024 * 1024;
const VIDEO_LIMIT_BYTES: u64 = 50 * 1024 * 1024;

const CONTENT_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("mp4", "video/mp4"),
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
];

/// Extract a lowercase extension from a filename.
///
/// Returns [`DEFAULT_EXTENSION`] when the name has no dot, or the suffix is
/// empty, too long, or contains anything other than ASCII alphanumerics.
pub fn extension_of(filename: &str) -> String {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return DEFAULT_EXTENSION.to_string();
    };

    if ext.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        return DEFAULT_EXTENSION.to_string();
    }

    ext.to_ascii_lowercase()
}

/// Map an extension (case-insensitive) to a content type
pub fn content_type_for(extension: &str) -> &'static str {
    let ext = extension.to_ascii_lowercase();
    CONTENT_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, ct)| *ct)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

/// Coarse grouping of a content type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    pub fn of(content_type: &str) -> Self {
        if content_type.starts_with("image/") {
            MediaKind::Image
        } else if content_type.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Other
        }
    }

    /// Images and videos are rendered inline and cached with the long TTL
    pub fn is_visual(self) -> bool {
        matches!(self, MediaKind::Image | MediaKind::Video)
    }
}

/// Bot API upload method. Each has its own size and processing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMethod {
    Photo,
    Animation,
    Video,
    Document,
}

impl UploadMethod {
    /// Choose the method for a payload of `size` bytes with `content_type`.
    ///
    /// Telegram recompresses photos and rejects vector or bitmap formats it
    /// cannot thumbnail, so only jpeg/png/webp go through `sendPhoto`.
    pub fn select(content_type: &str, size: u64) -> Self {
        match content_type {
            "image/jpeg" | "image/png" | "image/webp" if size <= PHOTO_LIMIT_BYTES => {
                UploadMethod::Photo
            }
            "image/gif" => UploadMethod::Animation,
            ct if ct.starts_with("video/") && size <= VIDEO_LIMIT_BYTES => UploadMethod::Video,
            _ => UploadMethod::Document,
        }
    }

    /// Bot API method name
    pub fn api_method(self) -> &'static str {
        match self {
            UploadMethod::Photo => "sendPhoto",
            UploadMethod::Animation => "sendAnimation",
            UploadMethod::Video => "sendVideo",
            UploadMethod::Document => "sendDocument",
        }
    }

    /// Multipart field carrying the file
    pub fn field_name(self) -> &'static str {
        match self {
            UploadMethod::Photo => "photo",
            UploadMethod::Animation => "animation",
            UploadMethod::Video => "video",
            UploadMethod::Document => "document",
        }
    }
}
