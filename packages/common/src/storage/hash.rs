use std::fmt;
use std::path::PathBuf;

use sha2::{Digest, Sha256};

/// Number of two-hex-character directory levels above each media file.
pub const SHARD_DEPTH: usize = 3;

/// SHA-256 digest addressing one stored attachment.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaKey([u8; 32]);

impl MediaKey {
    /// Stable address of one attachment of one post.
    pub fn for_media(tweet_id: u64, index: u32) -> Self {
        Self(Sha256::digest(format!("{tweet_id}:{index}").as_bytes()).into())
    }

    /// Return the hash as a 64-character lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Relative path `aa/bb/cc/<remaining 58 hex chars>`, four levels deep.
    pub fn shard_path(&self) -> PathBuf {
        let hex = self.to_hex();
        let mut path = PathBuf::new();
        for level in 0..SHARD_DEPTH {
            path.push(&hex[level * 2..level * 2 + 2]);
        }
        path.push(&hex[SHARD_DEPTH * 2..]);
        path
    }
}

impl fmt::Debug for MediaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MediaKey({})", self.to_hex())
    }
}
