use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;

use async_trait::async_trait;
use bytes::Bytes;

use super::{AssetError, AssetReader, AssetSource};

/// Serves assets from memory.
///
/// Directories are implied by the keys: `css/a.css` makes `css` listable.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetSource {
    assets: BTreeMap<String, Bytes>,
}

impl MemoryAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, path: impl Into<String>, content: impl Into<Bytes>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Bytes>) {
        let path = path.into();
        self.assets.insert(path.trim_start_matches('/').to_owned(), content.into());
    }
}

#[async_trait]
impl AssetSource for MemoryAssetSource {
    async fn open(&self, path: &str) -> Result<AssetReader, AssetError> {
        match self.assets.get(path) {
            Some(content) => Ok(Box::new(Cursor::new(content.clone()))),
            None => Err(AssetError::not_found(path)),
        }
    }

    async fn list(&self, path: &str) -> Result<Vec<String>, AssetError> {
        let dir = path.trim_matches('/');
        let prefix = if dir.is_empty() { String::new() } else { format!("{dir}/") };

        let children = self
            .assets
            .keys()
            .filter_map(|key| key.strip_prefix(prefix.as_str()))
            .filter_map(|rest| rest.split('/').next())
            .filter(|child| !child.is_empty())
            .collect::<BTreeSet<_>>();

        if children.is_empty() {
            return Err(AssetError::not_found(path));
        }
        Ok(children.into_iter().map(str::to_owned).collect())
    }
}
