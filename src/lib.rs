//! # TierKV
//!
//! Key-value server speaking a small line protocol (GET/SET/PING) over TCP,
//! backed by a layered store.
//!
//! ## Features
//!
//! - Shell-style quoting on the wire, so values may contain spaces
//! - Read-through/write-through caching over a durable RocksDB authority
//! - Negative caching: keys the authority lacks are not looked up again
//!   until they are written
//! - Prometheus metrics and health endpoints
//!
//! ## Example
//!
//! ```ignore
//! use tierkv::config::Config;
//! use tierkv::storage;
//!
//! let config = Config::from_env()?;
//! let store = storage::build(&config.storage)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐     ┌──────────────┐     ┌──────────────────────────┐
//! │ client   │────▶│ Session      │────▶│ CachingStore             │
//! │ (GET/SET │     │  ├─ tokenize │     │  ├─ known-missing keys   │
//! │  /PING)  │◀────│  └─ dispatch │     │  ├─ cache  (MemoryStore) │
//! └──────────┘     └──────────────┘     │  └─ authority (RocksDB)  │
//!                                       └──────────────────────────┘
//! ```

// Modules
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod prelude;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-exports for convenience
pub use error::{ProtocolError, Result, SessionError, StoreError, TierKvError};
