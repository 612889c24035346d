//! Runtime configuration for the stores, the workbench cache, and the
//! preloader. Mirrors the recognized-options table in the store's external
//! interface: every field here has a name and a default matching it.

use serde::{Deserialize, Serialize};

/// Which concrete backend a store is built on. Replaces the source system's
/// reflection-based class-name lookup with an explicit, enumerated factory
/// key.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// In-process, backed by a concurrent hash map. No durability.
    #[default]
    Memory,
    /// Durable, backed by a `sea_orm` SQL connection (SQLite in this crate's
    /// own tests and defaults; any `sea_orm`-supported database works).
    Sqlite,
}

/// Durability/consistency level requested of an external-cluster-backed
/// store. Meaningful only for `StoreBackend::Sqlite`, where it selects the
/// `PRAGMA synchronous` level; `Memory` ignores it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsistencyLevel {
    #[default]
    One,
    Quorum,
    All,
}

/// Which preload catalogs to seed at server startup. Each group is
/// independently toggleable, matching the source's `PRELOAD_CFG` groups.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadConfig {
    pub predicates: bool,
    pub resource_types: bool,
    pub identities: bool,
    pub datasets: bool,
    pub ais_resources: bool,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            predicates: true,
            resource_types: true,
            identities: true,
            datasets: false,
            ais_resources: false,
        }
    }
}

/// Top-level store configuration. Constructed once per process and handed
/// to the store factories and the workbench.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StoreConfig {
    pub commit_cache: StoreBackend,
    pub blob_cache: StoreBackend,
    pub cache_size: usize,
    pub store_timeout_secs: u64,
    pub consistency: ConsistencyLevel,
    pub verify_after_put: bool,
    pub preload: PreloadConfig,
    /// Connection string for `StoreBackend::Sqlite` (e.g.
    /// `sqlite://data.db?mode=rwc` or `sqlite::memory:`). Unused for
    /// `StoreBackend::Memory`.
    pub sqlite_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            commit_cache: StoreBackend::Memory,
            blob_cache: StoreBackend::Memory,
            cache_size: 100_000_000,
            store_timeout_secs: 60,
            consistency: ConsistencyLevel::One,
            verify_after_put: false,
            preload: PreloadConfig::default(),
            sqlite_url: "sqlite::memory:".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn store_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.store_timeout_secs)
    }
}
