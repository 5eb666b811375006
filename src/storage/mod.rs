//! Storage layer for TierKV
//!
//! Every backend implements [`Store`]. [`CachingStore`] is a `Store` built
//! from two other stores, so layers can be stacked.

mod caching;
mod memory;
mod record;
mod rocks;

#[cfg(test)]
pub(crate) mod mock;

pub use caching::{CachingStore, Lookup};
pub use memory::MemoryStore;
pub use rocks::RocksStore;

use crate::StoreError;
use crate::config::{AuthorityKind, StorageConfig};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

/// A string key/value store
#[async_trait]
pub trait Store: Send + Sync {
    /// Get a value by key. `Ok(None)` means the key is absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Build the store shared by every session
pub fn build(config: &StorageConfig) -> Result<Arc<dyn Store>, StoreError> {
    match config.authority {
        AuthorityKind::Rocksdb => {
            let authority = Arc::new(RocksStore::open(config)?);
            info!("Serving from RocksDB authority behind an in-memory cache");
            Ok(Arc::new(CachingStore::new(
                authority,
                Arc::new(MemoryStore::new()),
            )))
        }
        AuthorityKind::Memory => {
            info!("Serving from a single in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
