//! Error types for TierKV

use std::time::Duration;
use thiserror::Error;

/// Main error type for TierKV
#[derive(Error, Debug)]
pub enum TierKvError {
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Line protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("EOF found when expecting closing quote")]
    UnterminatedQuote,

    #[error("EOF found after escape character")]
    TrailingEscape,

    #[error("wrong number of arguments for '{0}' command")]
    WrongArity(&'static str),

    #[error("line exceeds {0} bytes")]
    LineTooLong(usize),
}

/// Store layer errors
///
/// The stage variants wrap the error of the layer below them, so the
/// rendered message reads as a chain: `could not set value in cache: ...`.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rust_rocksdb::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("value field not found in stored record")]
    NoValue,

    #[error("value field nil in stored record")]
    NilValue,

    #[error("table `{0}` does not exist")]
    MissingTable(String),

    #[error("Value encoding error: {0}")]
    Encoding(String),

    #[error("Value decoding error: {0}")]
    Decoding(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Backend(String),

    #[error("could not retrieve value from cache: {0}")]
    CacheRead(#[source] Box<StoreError>),

    #[error("could not retrieve value from authority: {0}")]
    AuthorityRead(#[source] Box<StoreError>),

    #[error("could not set value in cache: {0}")]
    CacheWrite(#[source] Box<StoreError>),

    #[error("could not set value in authority: {0}")]
    AuthorityWrite(#[source] Box<StoreError>),
}

/// Reasons a client session ends early
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("could not read from the store: {0}")]
    StoreRead(#[source] StoreError),

    #[error("could not write to the store: {0}")]
    StoreWrite(#[source] StoreError),

    #[error("malformed line: {0}")]
    Malformed(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TierKvError>;
