use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Media row returned from SELECT queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct MediaRow {
    pub key: String,
    /// Never leaves the server
    #[serde(skip_serializing)]
    pub blob_ref: String,
    pub content_type: String,
    pub extension: String,
    pub size_bytes: i64,
    /// Epoch milliseconds
    pub created_at: i64,
}

impl MediaRow {
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }
}

/// Parameters for inserting a media row
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub key: String,
    pub blob_ref: String,
    pub content_type: String,
    pub extension: String,
    pub size_bytes: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Most recent first
    #[default]
    #[serde(alias = "desc")]
    Newest,
    #[serde(alias = "asc")]
    Oldest,
}

/// One page of media rows
#[derive(Debug, Clone)]
pub struct MediaPage {
    pub records: Vec<MediaRow>,
    pub page: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u32,
}
