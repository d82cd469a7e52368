//! JSON codec for structured columns.
//!
//! The in-memory model stays fully typed; every structured field crosses
//! the store boundary through these two functions and nowhere else.

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::StoreError;

/// Encode a structured value for storage in a TEXT column.
pub fn encode<T: Serialize>(value: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a structured value from a TEXT column.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, StoreError> {
    Ok(serde_json::from_str(raw)?)
}
