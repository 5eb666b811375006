//! Two-tier store with negative caching
//!
//! Reads go to the cache first and fall through to the authority. Keys the
//! authority reported as absent are remembered, so repeated misses cost no
//! backend calls until the key is written through this store. A key written
//! to the authority by anyone else stays invisible while it is remembered
//! as missing.

use super::Store;
use crate::StoreError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::hash::{BuildHasher, RandomState};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const WRITE_LOCK_STRIPES: usize = 64;

/// Outcome of a layered read
#[derive(Debug)]
pub struct Lookup {
    pub value: Option<String>,
    /// Set when the value came from the authority but could not be
    /// mirrored into the cache. `value` is still valid.
    pub write_back: Option<StoreError>,
}

impl Lookup {
    fn found(value: String) -> Self {
        Self {
            value: Some(value),
            write_back: None,
        }
    }

    fn missing() -> Self {
        Self {
            value: None,
            write_back: None,
        }
    }
}

/// Keys the authority reported absent, plus the generation of the last
/// write to each key.
///
/// A read snapshots its key's generation before touching the backends and
/// only records a miss or mirrors a value if no write to that key started
/// in between.
#[derive(Default)]
struct KnownMissing {
    keys: HashSet<String>,
    written: HashMap<String, u64>,
    epoch: u64,
}

impl KnownMissing {
    fn generation(&self, key: &str) -> u64 {
        self.written.get(key).copied().unwrap_or(0)
    }

    fn forget(&mut self, key: &str) {
        self.epoch += 1;
        self.written.insert(key.to_string(), self.epoch);
        self.keys.remove(key);
    }
}

/// Read-through, write-through store over an authority and a cache
pub struct CachingStore {
    authority: Arc<dyn Store>,
    cache: Arc<dyn Store>,
    known_missing: RwLock<KnownMissing>,
    /// Serializes writes and cache write-backs of keys hashing to the same stripe
    write_locks: Box<[Mutex<()>]>,
    hasher: RandomState,
}

impl CachingStore {
    pub fn new(authority: Arc<dyn Store>, cache: Arc<dyn Store>) -> Self {
        Self {
            authority,
            cache,
            known_missing: RwLock::new(KnownMissing::default()),
            write_locks: (0..WRITE_LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
            hasher: RandomState::new(),
        }
    }

    /// Number of keys currently remembered as absent from the authority
    pub fn known_missing_len(&self) -> usize {
        self.known_missing.read().keys.len()
    }

    pub fn is_known_missing(&self, key: &str) -> bool {
        self.known_missing.read().keys.contains(key)
    }

    fn write_lock(&self, key: &str) -> &Mutex<()> {
        let stripe = self.hasher.hash_one(key) as usize % self.write_locks.len();
        &self.write_locks[stripe]
    }

    /// Layered read reporting both the value and any cache write-back failure.
    ///
    /// A cache read error is returned as-is; the authority is not consulted.
    /// A value read from the authority is not mirrored if the key was written
    /// while the read was in flight; that write fills the cache itself.
    pub async fn lookup(&self, key: &str) -> Result<Lookup, StoreError> {
        let since = {
            let missing = self.known_missing.read();
            if missing.keys.contains(key) {
                return Ok(Lookup::missing());
            }
            missing.generation(key)
        };

        if let Some(value) = self
            .cache
            .get(key)
            .await
            .map_err(|e| StoreError::CacheRead(Box::new(e)))?
        {
            return Ok(Lookup::found(value));
        }

        let Some(value) = self
            .authority
            .get(key)
            .await
            .map_err(|e| StoreError::AuthorityRead(Box::new(e)))?
        else {
            let mut missing = self.known_missing.write();
            if missing.generation(key) == since {
                debug!(key, "Authority miss, remembering key as missing");
                missing.keys.insert(key.to_string());
            }
            return Ok(Lookup::missing());
        };

        let _guard = self.write_lock(key).lock().await;
        let unchanged = self.known_missing.read().generation(key) == since;
        if !unchanged {
            debug!(key, "Key written during read, skipping cache write-back");
            return Ok(Lookup::found(value));
        }

        let write_back = self.mirror(key, &value).await.err();
        Ok(Lookup {
            value: Some(value),
            write_back,
        })
    }

    async fn mirror(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.cache
            .set(key, value)
            .await
            .map_err(|e| StoreError::CacheWrite(Box::new(e)))
    }
}

#[async_trait]
impl Store for CachingStore {
    /// A failed cache write-back does not fail the read; it is logged instead.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let lookup = self.lookup(key).await?;
        if let Some(e) = lookup.write_back {
            warn!(key, error = %e, "Serving authority value without caching it");
        }
        Ok(lookup.value)
    }

    /// Writes the authority first. If that fails the cache is left alone;
    /// if the cache write fails afterwards the authority write stands.
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock(key).lock().await;
        self.known_missing.write().forget(key);

        let written = self.authority.set(key, value).await;

        // A timed-out write may still land, so forget the key either way.
        self.known_missing.write().forget(key);
        written.map_err(|e| StoreError::AuthorityWrite(Box::new(e)))?;

        self.mirror(key, value).await
    }
}
