//! sqlx/SQLite-backed [`DocStore`]. Documents are stored as a single JSON
//! blob column plus an integer version used for the CAS check in
//! [`SqliteDocStore::update`]; `collection` is folded into the primary key
//! rather than one table per collection, since the number of collections is
//! small and fixed (`battles` today).

use super::{DocStore, VersionedDoc};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::Path;

pub struct SqliteDocStore {
    pool: SqlitePool,
}

impl SqliteDocStore {
    pub async fn connect(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = SqlitePool::connect(&db_url).await?;
        create_documents_table(&pool).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn create_documents_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 0,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl DocStore for SqliteDocStore {
    async fn create(&self, collection: &str, id: &str, doc: Value) -> Result<()> {
        let body = serde_json::to_string(&doc)
            .map_err(|e| Error::Internal(format!("serializing document: {e}")))?;
        let result = sqlx::query(
            "INSERT OR IGNORE INTO documents (collection, id, body, version) VALUES (?, ?, ?, 0)",
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Error::Conflict(format!(
                "{collection}/{id} already exists"
            )));
        }
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<VersionedDoc> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT body, version FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let (body, version) =
            row.ok_or_else(|| Error::NotFound(format!("{collection}/{id}")))?;
        let doc = serde_json::from_str(&body)
            .map_err(|e| Error::Internal(format!("deserializing document: {e}")))?;
        Ok(VersionedDoc {
            doc,
            version: version as u64,
        })
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        doc: Value,
        expected_version: u64,
    ) -> Result<()> {
        let body = serde_json::to_string(&doc)
            .map_err(|e| Error::Internal(format!("serializing document: {e}")))?;
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = ?, version = version + 1, updated_at = CURRENT_TIMESTAMP
            WHERE collection = ? AND id = ? AND version = ?
            "#,
        )
        .bind(body)
        .bind(collection)
        .bind(id)
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either the doc doesn't exist, or another writer raced us. Tell
            // them apart so callers can report the right error.
            if self.get(collection, id).await.is_err() {
                return Err(Error::NotFound(format!("{collection}/{id}")));
            }
            return Err(Error::Conflict(format!(
                "{collection}/{id} version mismatch: expected {expected_version}"
            )));
        }
        Ok(())
    }
}
