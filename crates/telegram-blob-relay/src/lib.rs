//! Telegram Blob Relay
//!
//! Uses a Telegram chat as a write-once blob store. Uploads return the
//! platform's file id; reads exchange that id for a short-lived download
//! link via `getFile` every time.

pub mod error;
pub mod media_type;
pub mod memory;
pub mod relay;
pub mod telegram;
pub mod types;

pub use error::{RelayError, Result};
pub use media_type::{content_type_for, extension_of, MediaKind, UploadMethod};
pub use memory::MemoryRelay;
pub use relay::{AdminNotifier, BlobRelay};
pub use telegram::TelegramRelay;
pub use types::FetchLocation;
