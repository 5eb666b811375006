//! RocksDB authority store
//!
//! Records live in one column family named after the configured table.
//! Each call runs on the blocking pool and is bounded by the request timeout.

use super::{Store, record};
use crate::StoreError;
use crate::config::StorageConfig;
use async_trait::async_trait;
use rust_rocksdb::{BlockBasedOptions, DB, DBCompactionStyle, Options};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, trace};

/// RocksDB-backed durable store
pub struct RocksStore {
    db: Arc<DB>,
    table: Arc<str>,
    timeout: Duration,
}

impl RocksStore {
    /// Open or create the database and its table
    pub fn open(config: &StorageConfig) -> Result<Self, StoreError> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);
        opts.set_max_background_jobs(config.max_background_jobs);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_compaction_style(DBCompactionStyle::Level);

        if config.enable_compression {
            opts.set_compression_type(rust_rocksdb::DBCompressionType::Lz4);
        } else {
            opts.set_compression_type(rust_rocksdb::DBCompressionType::None);
        }

        let mut block_opts = BlockBasedOptions::default();
        let cache = rust_rocksdb::Cache::new_lru_cache(config.block_cache_size);
        block_opts.set_block_cache(&cache);
        block_opts.set_bloom_filter(10.0, false);
        block_opts.set_cache_index_and_filter_blocks(true);
        opts.set_block_based_table_factory(&block_opts);

        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Internal(format!("Failed to create directory: {e}"))
            })?;
        }

        // The authority is the source of truth, so the WAL stays on.
        let db = DB::open_cf(&opts, &config.db_path, [config.table.as_str()])?;

        info!(
            "RocksDB opened: path={:?}, table={}, timeout={:?}",
            config.db_path,
            config.table,
            config.request_timeout(),
        );

        Ok(Self {
            db: Arc::new(db),
            table: Arc::from(config.table.as_str()),
            timeout: config.request_timeout(),
        })
    }

    /// Run a blocking database call, giving up after the request timeout.
    ///
    /// A call that times out keeps running on the blocking pool; only the
    /// caller stops waiting for it.
    async fn call<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&DB, &str) -> Result<T, StoreError> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let table = Arc::clone(&self.table);
        let task = tokio::task::spawn_blocking(move || op(&*db, &*table));

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(StoreError::Internal(format!("storage task failed: {e}"))),
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }

    #[cfg(test)]
    fn put_raw(&self, key: &str, bytes: &[u8]) {
        let cf = self.db.cf_handle(&self.table).unwrap();
        self.db.put_cf(&cf, key.as_bytes(), bytes).unwrap();
    }
}

#[async_trait]
impl Store for RocksStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let owned_key = key.to_string();
        let raw = self
            .call(move |db, table| {
                let cf = db
                    .cf_handle(table)
                    .ok_or_else(|| StoreError::MissingTable(table.to_string()))?;
                Ok(db.get_cf(&cf, owned_key.as_bytes())?)
            })
            .await?;

        trace!(key, found = raw.is_some(), "Authority read");

        match raw {
            Some(bytes) => record::decode(&bytes),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let encoded = record::encode(key, value)?;
        let owned_key = key.to_string();
        self.call(move |db, table| {
            let cf = db
                .cf_handle(table)
                .ok_or_else(|| StoreError::MissingTable(table.to_string()))?;
            db.put_cf(&cf, owned_key.as_bytes(), &encoded)?;
            Ok(())
        })
        .await?;

        trace!(key, "Authority write");
        Ok(())
    }
}
