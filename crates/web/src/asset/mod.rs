//! Where asset bytes come from.
//!
//! The server never touches storage directly: the static asset handler asks
//! an [`AssetSource`] to open or list a logical path. Logical paths are
//! relative, `/` separated and case-sensitive, e.g. `css/site.css`.
//!
//! - [`FsAssetSource`]: a directory on disk
//! - [`MemoryAssetSource`]: an in-memory map, handy for bundled assets and tests

mod fs;
mod memory;

pub use fs::FsAssetSource;
pub use memory::MemoryAssetSource;

use std::io;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncRead;

/// An open asset, read exactly once by the response body that streams it.
pub type AssetReader = Box<dyn AsyncRead + Send + Unpin>;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset '{path}' not found")]
    NotFound { path: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl AssetError {
    pub fn not_found<S: ToString>(path: S) -> Self {
        Self::NotFound { path: path.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Storage the static asset handler reads from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Opens `path` for reading.
    ///
    /// Fails with [`AssetError::NotFound`] when `path` does not name a file,
    /// which includes directories.
    async fn open(&self, path: &str) -> Result<AssetReader, AssetError>;

    /// Names of the entries directly under the directory `path`, in the
    /// order they should be listed.
    async fn list(&self, path: &str) -> Result<Vec<String>, AssetError>;
}
