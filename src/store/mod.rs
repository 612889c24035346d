//! The dual-tier persistent store: a blob key/value store and an indexed
//! commit store, each with a `memory` and a `sqlite` backend selected by
//! `StoreConfig`.

pub mod blob_store;
pub mod commit_store;

pub use blob_store::{BlobStore, MemoryBlobStore, SqliteBlobStore};
pub use commit_store::{
    CommitRow, CommitStore, MemoryCommitStore, Op, Predicate, SqliteCommitStore, INDEX_COLUMNS,
};

use std::sync::Arc;

use sea_orm::{Database, DatabaseConnection};

use crate::config::{StoreBackend, StoreConfig};
use crate::errors::StoreError;

/// Build the blob store selected by configuration.
pub async fn open_blob_store(config: &StoreConfig) -> Result<Arc<dyn BlobStore>, StoreError> {
    match config.blob_cache {
        StoreBackend::Memory => Ok(Arc::new(MemoryBlobStore::new())),
        StoreBackend::Sqlite => {
            let db = connect(config).await?;
            let store = SqliteBlobStore::new(db).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Build the commit store selected by configuration.
pub async fn open_commit_store(config: &StoreConfig) -> Result<Arc<dyn CommitStore>, StoreError> {
    match config.commit_cache {
        StoreBackend::Memory => Ok(Arc::new(MemoryCommitStore::new())),
        StoreBackend::Sqlite => {
            let db = connect(config).await?;
            let store = SqliteCommitStore::new(db).await?;
            Ok(Arc::new(store))
        }
    }
}

async fn connect(config: &StoreConfig) -> Result<DatabaseConnection, StoreError> {
    Database::connect(&config.sqlite_url)
        .await
        .map_err(StoreError::from)
}
