//! Key-addressable sources of raw image bytes.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while loading or decoding an asset.
///
/// `Clone` because a single failed decode is broadcast to every task
/// waiting on the same key. Failures are terminal for the key: the
/// loader caches them and does not retry within the process lifetime.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    /// The source has no entry for this key.
    #[error("asset not found: {key}")]
    NotFound { key: String },

    /// Reading the raw bytes failed.
    #[error("failed to read asset {key}: {message}")]
    Io { key: String, message: String },

    /// The bytes were read but are not a decodable image.
    #[error("failed to decode asset {key}: {message}")]
    Decode { key: String, message: String },

    /// The decode task went away without producing a result.
    #[error("asset load for {key} did not complete: {message}")]
    Internal { key: String, message: String },
}

impl AssetError {
    /// The asset key this error is about.
    pub fn key(&self) -> &str {
        match self {
            AssetError::NotFound { key }
            | AssetError::Io { key, .. }
            | AssetError::Decode { key, .. }
            | AssetError::Internal { key, .. } => key,
        }
    }
}

/// A key-addressable, read-only source of raw image bytes.
///
/// Implementations are called from `spawn_blocking`, so blocking I/O is
/// fine here. Failure is terminal for that key.
pub trait AssetSource: Send + Sync + 'static {
    /// Returns the raw encoded bytes for `key`.
    fn load(&self, key: &str) -> Result<Vec<u8>, AssetError>;
}

/// Filesystem-backed asset source.
///
/// Keys are paths relative to the configured root directory, e.g.
/// `"png/chassis_front.png"`.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    /// Creates a source rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The root directory assets are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for FsAssetSource {
    fn load(&self, key: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.root.join(key);
        if !path.is_file() {
            return Err(AssetError::NotFound {
                key: key.to_string(),
            });
        }
        fs::read(&path).map_err(|err| AssetError::Io {
            key: key.to_string(),
            message: err.to_string(),
        })
    }
}
