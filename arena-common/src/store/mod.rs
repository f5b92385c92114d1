//! Persistence adapters (C7): [`BlobStore`] for audio bytes, [`DocStore`] for
//! battle records. Both are swappable with in-memory fakes for tests; no
//! cloud-vendor specifics leak into the trait surface. Documents are plain
//! JSON (`serde_json::Value`) — callers own the schema.

mod fs;
mod memory;
#[cfg(feature = "sqlite-store")]
mod sqlite;

pub use fs::FsBlobStore;
pub use memory::{MemoryBlobStore, MemoryDocStore};
#[cfg(feature = "sqlite-store")]
pub use sqlite::SqliteDocStore;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `key`, returning a URI the caller can later
    /// resolve with [`BlobStore::get`]. Content-addressing is the caller's
    /// discretion — this trait makes no ordering or dedup guarantees.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<String>;

    async fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// A document alongside the version it was read at, for optimistic
/// concurrency on [`DocStore::update`].
#[derive(Debug, Clone)]
pub struct VersionedDoc {
    pub doc: Value,
    pub version: u64,
}

#[async_trait]
pub trait DocStore: Send + Sync {
    /// Fails with [`crate::error::Error::Conflict`] if `id` already exists in
    /// `collection`.
    async fn create(&self, collection: &str, id: &str, doc: Value) -> Result<()>;

    async fn get(&self, collection: &str, id: &str) -> Result<VersionedDoc>;

    /// Compare-and-swap replace. Fails with [`crate::error::Error::Conflict`]
    /// if the stored version no longer matches `expected_version`.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        expected_version: u64,
    ) -> Result<()>;
}
