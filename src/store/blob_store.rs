//! Blob store: key→bytes mapping. Keys are content hashes, so a put of an
//! existing key with identical bytes is a no-op and concurrent puts of
//! distinct keys need no coordination.

use async_trait::async_trait;
use dashmap::DashMap;
use sea_orm::{ConnectionTrait, DatabaseConnection, Statement};

use crate::errors::StoreError;
use crate::hash::BlobKey;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, key: BlobKey, bytes: Vec<u8>) -> Result<(), StoreError>;
    async fn get(&self, key: BlobKey) -> Result<Vec<u8>, StoreError>;
    async fn has(&self, key: BlobKey) -> Result<bool, StoreError>;
    async fn remove(&self, key: BlobKey) -> Result<(), StoreError>;
}

/// In-process blob store backed by a concurrent hash map. No durability;
/// the default for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryBlobStore {
    rows: DashMap<BlobKey, Vec<u8>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: BlobKey, bytes: Vec<u8>) -> Result<(), StoreError> {
        // Idempotent by construction: callers only ever put (key, bytes)
        // pairs where key == hash(bytes), so re-inserting an existing key
        // always writes identical bytes.
        self.rows.insert(key, bytes);
        Ok(())
    }

    async fn get(&self, key: BlobKey) -> Result<Vec<u8>, StoreError> {
        self.rows
            .get(&key)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StoreError::not_found(format!("blob {key} not found")))
    }

    async fn has(&self, key: BlobKey) -> Result<bool, StoreError> {
        Ok(self.rows.contains_key(&key))
    }

    async fn remove(&self, key: BlobKey) -> Result<(), StoreError> {
        self.rows.remove(&key);
        Ok(())
    }
}

/// Durable blob store backed by a `sea_orm` connection. Issues
/// parameterized statements against a single `blobs(key, bytes)` table so
/// it works unmodified against any `sea_orm`-supported backend.
pub struct SqliteBlobStore {
    db: DatabaseConnection,
}

impl SqliteBlobStore {
    pub async fn new(db: DatabaseConnection) -> Result<Self, StoreError> {
        let backend = db.get_database_backend();
        db.execute(Statement::from_string(
            backend,
            "CREATE TABLE IF NOT EXISTS blobs (key TEXT PRIMARY KEY, bytes BLOB NOT NULL)"
                .to_owned(),
        ))
        .await?;
        Ok(SqliteBlobStore { db })
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn put(&self, key: BlobKey, bytes: Vec<u8>) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        self.db
            .execute(Statement::from_sql_and_values(
                backend,
                "INSERT INTO blobs (key, bytes) VALUES ($1, $2) \
                 ON CONFLICT(key) DO UPDATE SET bytes = excluded.bytes",
                [key.to_hex().into(), bytes.into()],
            ))
            .await?;
        Ok(())
    }

    async fn get(&self, key: BlobKey) -> Result<Vec<u8>, StoreError> {
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                backend,
                "SELECT bytes FROM blobs WHERE key = $1",
                [key.to_hex().into()],
            ))
            .await?
            .ok_or_else(|| StoreError::not_found(format!("blob {key} not found")))?;
        Ok(row.try_get("", "bytes")?)
    }

    async fn has(&self, key: BlobKey) -> Result<bool, StoreError> {
        let backend = self.db.get_database_backend();
        let row = self
            .db
            .query_one(Statement::from_sql_and_values(
                backend,
                "SELECT 1 AS present FROM blobs WHERE key = $1",
                [key.to_hex().into()],
            ))
            .await?;
        Ok(row.is_some())
    }

    async fn remove(&self, key: BlobKey) -> Result<(), StoreError> {
        let backend = self.db.get_database_backend();
        self.db
            .execute(Statement::from_sql_and_values(
                backend,
                "DELETE FROM blobs WHERE key = $1",
                [key.to_hex().into()],
            ))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_round_trip() {
        let store = MemoryBlobStore::new();
        let key = BlobKey::new(b"hello");
        store.put(key, b"hello".to_vec()).await.unwrap();
        assert_eq!(store.get(key).await.unwrap(), b"hello");
        assert!(store.has(key).await.unwrap());
    }

    #[tokio::test]
    async fn memory_miss_is_not_found() {
        let store = MemoryBlobStore::new();
        let key = BlobKey::new(b"missing");
        assert!(matches!(
            store.get(key).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn memory_put_is_idempotent() {
        let store = MemoryBlobStore::new();
        let key = BlobKey::new(b"hello");
        store.put(key, b"hello".to_vec()).await.unwrap();
        store.put(key, b"hello".to_vec()).await.unwrap();
        assert_eq!(store.get(key).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn memory_remove() {
        let store = MemoryBlobStore::new();
        let key = BlobKey::new(b"gone soon");
        store.put(key, b"gone soon".to_vec()).await.unwrap();
        store.remove(key).await.unwrap();
        assert!(!store.has(key).await.unwrap());
    }
}
