use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::trace;

use super::{AssetError, AssetReader, AssetSource};

/// Serves assets from a directory on disk.
///
/// Paths that try to leave the root (`..`, absolute paths) are reported as
/// not found. Listings are sorted by name.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, AssetError> {
        let mut resolved = self.root.clone();
        for component in Path::new(path).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    trace!(path, "reject asset path outside of root");
                    return Err(AssetError::not_found(path));
                }
            }
        }
        Ok(resolved)
    }
}

fn map_io_error(path: &str, e: io::Error) -> AssetError {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => AssetError::not_found(path),
        _ => AssetError::from(e),
    }
}

#[async_trait]
impl AssetSource for FsAssetSource {
    async fn open(&self, path: &str) -> Result<AssetReader, AssetError> {
        let file_path = self.resolve(path)?;

        let metadata = tokio::fs::metadata(&file_path).await.map_err(|e| map_io_error(path, e))?;
        if !metadata.is_file() {
            return Err(AssetError::not_found(path));
        }

        let file = tokio::fs::File::open(&file_path).await.map_err(|e| map_io_error(path, e))?;
        Ok(Box::new(file))
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, AssetError> {
        let dir_path = self.resolve(path)?;

        let mut read_dir = tokio::fs::read_dir(&dir_path).await.map_err(|e| map_io_error(path, e))?;
        let mut entries = vec![];
        while let Some(entry) = read_dir.next_entry().await? {
            entries.push(entry.file_name().to_string_lossy().into_owned());
        }

        entries.sort();
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn asset_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(dir.path().join("css/b.css"), "b{}").unwrap();
        std::fs::write(dir.path().join("css/a.css"), "a{}").unwrap();
        dir
    }

    #[tokio::test]
    async fn opens_nested_file() {
        let dir = asset_dir();
        let source = FsAssetSource::new(dir.path());

        let mut reader = source.open("css/a.css").await.unwrap();
        let mut content = String::new();
        reader.read_to_string(&mut content).await.unwrap();

        assert_eq!(content, "a{}");
    }

    #[tokio::test]
    async fn directory_is_not_an_asset() {
        let dir = asset_dir();
        let source = FsAssetSource::new(dir.path());

        assert!(source.open("css").await.err().unwrap().is_not_found());
        assert!(source.open("missing.js").await.err().unwrap().is_not_found());
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let dir = asset_dir();
        let source = FsAssetSource::new(dir.path().join("css"));

        assert!(source.open("../index.html").await.err().unwrap().is_not_found());
        assert!(source.list("/").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn lists_sorted_entries() {
        let dir = asset_dir();
        let source = FsAssetSource::new(dir.path());

        assert_eq!(source.list("css").await.unwrap(), vec!["a.css", "b.css"]);
        assert_eq!(source.list("").await.unwrap(), vec!["css", "index.html"]);
        assert!(source.list("index.html").await.unwrap_err().is_not_found());
    }
}
