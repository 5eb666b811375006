//! Record encoding for the durable store
//!
//! Each key maps to a JSON object `{"key": <key>, "value": <value>}`.
//! An empty object reads as absent. A record without a `value` field, or
//! with a `value` that is not a string, is reported as an error rather
//! than as a miss.

use crate::StoreError;
use serde::Serialize;
use serde_json::{Map, Value};

const VALUE_FIELD: &str = "value";

#[derive(Serialize)]
struct Record<'a> {
    key: &'a str,
    value: &'a str,
}

/// Encode a key/value pair to bytes for storage
pub fn encode(key: &str, value: &str) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&Record { key, value }).map_err(|e| StoreError::Encoding(e.to_string()))
}

/// Decode the value held in a stored record
pub fn decode(bytes: &[u8]) -> Result<Option<String>, StoreError> {
    let item: Map<String, Value> =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Decoding(e.to_string()))?;

    if item.is_empty() {
        return Ok(None);
    }

    match item.get(VALUE_FIELD) {
        None => Err(StoreError::NoValue),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(StoreError::NilValue),
    }
}
