//! Request DTOs for the store API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::{MAX_KEY_LENGTH, MAX_VALUE_SIZE};

fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}

fn validate_value(value: &str) -> Option<String> {
    if value.len() > MAX_VALUE_SIZE {
        return Some(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_SIZE
        ));
    }
    None
}

/// Request body for SET operations (PUT /set, PUT /caches/:cache/keys)
///
/// # Fields
/// - `key`: The key to store the value under
/// - `value`: The value to store
/// - `ttl`: Optional TTL in seconds (uses the store default if not specified)
#[derive(Debug, Clone, Deserialize)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        validate_key(&self.key).or_else(|| validate_value(&self.value))
    }
}

/// Request body for PUT /addr
#[derive(Debug, Clone, Deserialize)]
pub struct AddressSetRequest {
    /// Compound key, `cache:key` or `cache:store:key`
    pub address: String,
    pub value: String,
    #[serde(default)]
    pub ttl: Option<u64>,
}

impl AddressSetRequest {
    pub fn validate(&self) -> Option<String> {
        validate_value(&self.value)
    }
}

/// Request body for POST /expire
#[derive(Debug, Clone, Deserialize)]
pub struct ExpireRequest {
    pub key: String,
    /// New TTL in seconds, counted from now
    pub ttl: u64,
}

/// Request body for POST /caches
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCacheRequest {
    pub name: String,
}

/// Request body for POST /caches/:cache/stores
#[derive(Debug, Clone, Deserialize)]
pub struct CreateStoreRequest {
    pub name: String,
    /// Default TTL in seconds for keys set in this store
    #[serde(default)]
    pub ttl: Option<u64>,
}

/// Query string for GET /caches/:cache/search
///
/// `pattern` is a glob unless `regex=true`. An empty pattern matches every key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub regex: bool,
}

/// Query string for GET /caches/:cache/find
#[derive(Debug, Clone, Deserialize)]
pub struct FindQuery {
    pub value: String,
}
