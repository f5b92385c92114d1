//! Filesystem-backed [`BlobStore`]: one file per key under a root directory.
//! Content type is not persisted — callers re-derive it from the key's
//! extension on read, the same convention the battle-blob keys already carry
//! (`<battle_uuid>/{a,b}.wav`).

use super::BlobStore;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.contains("..") {
            return Err(Error::InvalidInput(format!("unsafe blob key {key}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(format!("file://{}", path.display()))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        tokio::fs::read(&path)
            .await
            .map_err(|_| Error::NotFound(format!("blob {key}")))
    }
}
