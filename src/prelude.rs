//! Prelude module for common imports.
//!
//! # Usage
//!
//! ```ignore
//! use tierkv::prelude::*;
//! ```

// Error types
pub use crate::error::{ProtocolError, Result, SessionError, StoreError, TierKvError};

// Configuration
pub use crate::config::{AuthorityKind, Config, MetricsConfig, ServerConfig, StorageConfig};

// Storage
pub use crate::storage::{CachingStore, Lookup, MemoryStore, RocksStore, Store};

// Protocol
pub use crate::protocol::{Command, ResponseWriter};

// Metrics
pub use crate::metrics::Metrics;

// Server
pub use crate::server::{Server, Session};

// Common external crates
pub use std::sync::Arc;
pub use tracing::{debug, error, info, trace, warn};
