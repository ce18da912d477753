use std::path::{Path, PathBuf};

use tokio::fs;

use super::error::StorageError;
use super::hash::MediaKey;

/// Filesystem-backed media store.
///
/// Each attachment lives at a path derived from its post id and attachment
/// index, sharded so no directory grows past 256 entries per level:
/// `{base_path}/aa/bb/cc/{remaining hex}{extension}`
pub struct FilesystemMediaStore {
    base_path: PathBuf,
    max_size: u64,
}

impl FilesystemMediaStore {
    /// Create a new store, creating the base directory if needed.
    pub async fn new(base_path: PathBuf, max_size: u64) -> Result<Self, StorageError> {
        fs::create_dir_all(&base_path).await?;
        fs::create_dir_all(base_path.join(".tmp")).await?;
        Ok(Self {
            base_path,
            max_size,
        })
    }

    /// Where the attachment is (or would be) stored.
    pub fn media_path(&self, tweet_id: u64, index: u32, extension: &str) -> PathBuf {
        let mut relative = MediaKey::for_media(tweet_id, index).shard_path();
        if !extension.is_empty() {
            let name = relative
                .file_name()
                .map(|n| format!("{}{extension}", n.to_string_lossy()))
                .unwrap_or_default();
            relative.set_file_name(name);
        }
        self.base_path.join(relative)
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    /// Write one attachment and return its final path.
    ///
    /// Writing the same key twice leaves a single file in place.
    pub async fn put(
        &self,
        tweet_id: u64,
        index: u32,
        extension: &str,
        data: &[u8],
    ) -> Result<PathBuf, StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }

        let media_path = self.media_path(tweet_id, index, extension);
        if fs::try_exists(&media_path).await? {
            return Ok(media_path);
        }

        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        if let Some(parent) = media_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        if let Err(e) = fs::rename(&temp_path, &media_path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        Ok(media_path)
    }

    /// Delete the whole media tree. Returns `false` if it did not exist.
    pub async fn remove_all(base_path: &Path) -> Result<bool, StorageError> {
        match fs::remove_dir_all(base_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
