//! In-memory fakes for [`super::BlobStore`] and [`super::DocStore`], used in
//! tests and local dev runs where no object store or document database is
//! wired up.

use super::{BlobStore, DocStore, VersionedDoc};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<String> {
        self.blobs.lock().unwrap().insert(key.to_string(), bytes);
        Ok(format!("mem://{key}"))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("blob {key}")))
    }
}

#[derive(Default)]
pub struct MemoryDocStore {
    docs: Mutex<HashMap<(String, String), VersionedDoc>>,
}

impl MemoryDocStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn clone_entry(entry: &VersionedDoc) -> VersionedDoc {
    VersionedDoc {
        doc: entry.doc.clone(),
        version: entry.version,
    }
}

#[async_trait]
impl DocStore for MemoryDocStore {
    async fn create(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        let mut docs = self.docs.lock().unwrap();
        let key = (collection.to_string(), id.to_string());
        if docs.contains_key(&key) {
            return Err(Error::Conflict(format!(
                "{collection}/{id} already exists"
            )));
        }
        docs.insert(key, VersionedDoc { doc, version: 0 });
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<VersionedDoc> {
        self.docs
            .lock()
            .unwrap()
            .get(&(collection.to_string(), id.to_string()))
            .map(clone_entry)
            .ok_or_else(|| Error::NotFound(format!("{collection}/{id}")))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        expected_version: u64,
    ) -> Result<()> {
        let mut docs = self.docs.lock().unwrap();
        let key = (collection.to_string(), id.to_string());
        let entry = docs
            .get_mut(&key)
            .ok_or_else(|| Error::NotFound(format!("{collection}/{id}")))?;
        if entry.version != expected_version {
            return Err(Error::Conflict(format!(
                "{collection}/{id} version mismatch: expected {expected_version}, found {}",
                entry.version
            )));
        }
        entry.doc = doc;
        entry.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn blob_round_trip() {
        let store = MemoryBlobStore::new();
        let uri = store.put("a/b.mp3", b"abc".to_vec(), "audio/mpeg").await.unwrap();
        assert!(uri.contains("a/b.mp3"));
        assert_eq!(store.get("a/b.mp3").await.unwrap(), b"abc".to_vec());
    }

    #[tokio::test]
    async fn blob_missing_key_not_found() {
        let store = MemoryBlobStore::new();
        assert!(matches!(store.get("nope").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn doc_create_then_get_round_trips() {
        let store = MemoryDocStore::new();
        store.create("battles", "1", json!({"a": 1})).await.unwrap();
        let got = store.get("battles", "1").await.unwrap();
        assert_eq!(got.doc, json!({"a": 1}));
        assert_eq!(got.version, 0);
    }

    #[tokio::test]
    async fn doc_create_twice_conflicts() {
        let store = MemoryDocStore::new();
        store.create("battles", "1", json!({})).await.unwrap();
        assert!(matches!(
            store.create("battles", "1", json!({})).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn doc_update_with_stale_version_conflicts() {
        let store = MemoryDocStore::new();
        store.create("battles", "1", json!({"v": 0})).await.unwrap();
        store
            .update("battles", "1", json!({"v": 1}), 0)
            .await
            .unwrap();
        assert!(matches!(
            store.update("battles", "1", json!({"v": 2}), 0).await,
            Err(Error::Conflict(_))
        ));
        let got = store.get("battles", "1").await.unwrap();
        assert_eq!(got.doc, json!({"v": 1}));
        assert_eq!(got.version, 1);
    }
}
