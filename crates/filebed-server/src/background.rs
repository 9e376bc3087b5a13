//! Decorative background images from the Bing daily archive

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{Result, ServerError};

const IMAGE_COUNT: u32 = 5;

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    images: Vec<ArchiveImage>,
}

/// One archive entry; only `url` is rewritten, the rest is passed through
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveImage {
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body returned by `GET /bing-images`
#[derive(Debug, Clone, Serialize)]
pub struct BackgroundList {
    pub status: bool,
    pub message: String,
    pub data: Vec<ArchiveImage>,
}

pub struct BackgroundImages {
    client: reqwest::Client,
    base_url: String,
}

impl BackgroundImages {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the latest archive images with absolute URLs
    pub async fn fetch(&self) -> Result<BackgroundList> {
        let url = format!(
            "{}/HPImageArchive.aspx?format=js&idx=0&n={}",
            self.base_url, IMAGE_COUNT
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            warn!(status = %response.status(), "Background image archive returned an error");
            return Err(ServerError::Upstream(format!(
                "background archive answered {}",
                response.status()
            )));
        }

        let archive: ArchiveResponse = response.json().await?;
        debug!(count = archive.images.len(), "Fetched background images");
        Ok(self.absolutize(archive))
    }

    fn absolutize(&self, archive: ArchiveResponse) -> BackgroundList {
        let data = archive
            .images
            .into_iter()
            .map(|mut image| {
                if !image.url.starts_with("http") {
                    image.url = format!("{}{}", self.base_url, image.url);
                }
                image
            })
            .collect();

        BackgroundList {
            status: true,
            message: "ok".to_string(),
            data,
        }
    }
}
