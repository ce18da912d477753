//! Attachment download and storage.

use std::io::Write;
use std::time::Duration;

use common::config::{MediaConfig, MediaMethod};
use common::storage::{FilesystemMediaStore, StorageError};
use common::{MediaRef, Status};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use futures::StreamExt;
use reqwest::{Client, Url};
use store::{MediaContent, StoredMedia};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Payload exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Compression failed: {0}")]
    Compress(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

pub struct MediaFetcher {
    client: Client,
    method: MediaMethod,
    files: Option<FilesystemMediaStore>,
    max_size: u64,
}

impl MediaFetcher {
    pub async fn new(config: &MediaConfig) -> Result<Self, crate::error::IngestError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| crate::error::IngestError::InvalidConfig(e.to_string()))?;

        let files = match config.method {
            MediaMethod::File => {
                Some(FilesystemMediaStore::new(config.path.clone(), config.max_size_bytes).await?)
            }
            MediaMethod::Blob => None,
        };

        Ok(Self {
            client,
            method: config.method,
            files,
            max_size: config.max_size_bytes,
        })
    }

    /// Fetch every attachment of `status`. Failed attachments are logged and left out.
    pub async fn fetch_all(&self, status: &Status) -> Vec<StoredMedia> {
        let mut stored = Vec::new();
        for media in status.media_refs() {
            match self.fetch_one(status.id, &media).await {
                Ok(item) => stored.push(item),
                Err(e) => warn!(
                    tweet_id = status.id,
                    index = media.index,
                    url = %media.url,
                    error = %e,
                    "Skipping attachment"
                ),
            }
        }
        stored
    }

    pub async fn fetch_one(&self, tweet_id: u64, media: &MediaRef) -> Result<StoredMedia, MediaError> {
        let bytes = self.download(&media.url).await?;
        debug!(tweet_id, index = media.index, bytes = bytes.len(), "Fetched attachment");

        let content = match (&self.method, &self.files) {
            (MediaMethod::File, Some(files)) => {
                let path = files
                    .put(tweet_id, media.index, &extension(&media.url), &bytes)
                    .await?;
                MediaContent::File(path.to_string_lossy().into_owned())
            }
            _ => MediaContent::Blob(compress(&bytes)?),
        };

        Ok(StoredMedia {
            index: media.index,
            kind: media.kind.clone(),
            native_filename: native_filename(&media.url),
            content,
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, MediaError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::Status(status.as_u16()));
        }
        if response.content_length().is_some_and(|len| len > self.max_size) {
            return Err(MediaError::TooLarge {
                limit: self.max_size,
            });
        }

        let mut body = response.bytes_stream();
        let mut bytes = Vec::new();
        while let Some(chunk) = body.next().await {
            let chunk = chunk?;
            if (bytes.len() + chunk.len()) as u64 > self.max_size {
                return Err(MediaError::TooLarge {
                    limit: self.max_size,
                });
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

pub fn compress(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Last path segment of the source URL.
pub fn native_filename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .next_back()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// `.ext` of the source URL path, or empty.
pub fn extension(url: &str) -> String {
    native_filename(url)
        .and_then(|name| {
            name.rfind('.')
                .filter(|&dot| dot > 0 && dot + 1 < name.len())
                .map(|dot| name[dot..].to_ascii_lowercase())
        })
        .unwrap_or_default()
}
