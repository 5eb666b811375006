//! Scripted store for tests

use super::{MemoryStore, Store};
use crate::StoreError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tokio::sync::oneshot;

type Scripted<T> = Result<T, String>;

/// Store returning canned results and recording every call.
///
/// Keys with no scripted answer read as absent and accept writes.
#[derive(Default)]
pub struct MockStore {
    gets: Mutex<HashMap<String, Scripted<Option<String>>>>,
    sets: Mutex<HashMap<String, Scripted<()>>>,
    calls: Mutex<Vec<String>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(&self, key: &str, value: Option<&str>) -> &Self {
        self.gets
            .lock()
            .insert(key.to_string(), Ok(value.map(str::to_string)));
        self
    }

    pub fn on_get_error(&self, key: &str, message: &str) -> &Self {
        self.gets
            .lock()
            .insert(key.to_string(), Err(message.to_string()));
        self
    }

    pub fn on_set_error(&self, key: &str, message: &str) -> &Self {
        self.sets
            .lock()
            .insert(key.to_string(), Err(message.to_string()));
        self
    }

    /// Calls seen so far, rendered as `get key` / `set key value`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Store for MockStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.calls.lock().push(format!("get {key}"));
        match self.gets.lock().get(key) {
            Some(Ok(value)) => Ok(value.clone()),
            Some(Err(message)) => Err(StoreError::Backend(message.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.calls.lock().push(format!("set {key} {value}"));
        match self.sets.lock().get(key) {
            Some(Err(message)) => Err(StoreError::Backend(message.clone())),
            _ => Ok(()),
        }
    }
}

struct Gate {
    key: String,
    reached: oneshot::Sender<()>,
    release: oneshot::Receiver<()>,
}

/// In-memory store whose next read of a chosen key can be held open after
/// it has read its value, to pin down interleavings with writes.
#[derive(Default)]
pub struct GatedStore {
    inner: MemoryStore,
    gate: Mutex<Option<Gate>>,
    gets: Mutex<HashMap<String, usize>>,
}

impl GatedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold the next `get(key)`. The first channel fires once that read has
    /// its value; sending on the second lets it return.
    pub fn hold_next_get(&self, key: &str) -> (oneshot::Receiver<()>, oneshot::Sender<()>) {
        let (reached_tx, reached_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.gate.lock() = Some(Gate {
            key: key.to_string(),
            reached: reached_tx,
            release: release_rx,
        });
        (reached_rx, release_tx)
    }

    pub fn gets_of(&self, key: &str) -> usize {
        self.gets.lock().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Store for GatedStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        *self.gets.lock().entry(key.to_string()).or_default() += 1;
        let value = self.inner.get(key).await?;

        let gate = {
            let mut gate = self.gate.lock();
            if gate.as_ref().is_some_and(|g| g.key == key) {
                gate.take()
            } else {
                None
            }
        };
        if let Some(gate) = gate {
            let _ = gate.reached.send(());
            let _ = gate.release.await;
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value).await
    }
}
