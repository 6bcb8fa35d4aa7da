//! Response DTOs for the store API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::{CacheInfo, StoreInfo, StoreStats};

/// Response body for GET operations
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: String,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Response body for SET operations
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was set
    pub key: String,
    /// Value replaced by this write, if any
    pub previous: Option<String>,
}

impl SetResponse {
    pub fn new(key: impl Into<String>, previous: Option<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
            previous,
        }
    }
}

/// Response body for DELETE operations
///
/// Deleting an absent key succeeds with `deleted: false`.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    pub deleted: bool,
    /// Value removed by this delete, if any
    pub previous: Option<String>,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, previous: Option<String>) -> Self {
        Self {
            key: key.into(),
            deleted: previous.is_some(),
            previous,
        }
    }
}

/// Response body for POST /expire
#[derive(Debug, Clone, Serialize)]
pub struct ExpireResponse {
    pub key: String,
    /// False when the key did not exist
    pub updated: bool,
}

/// Generic acknowledgement for lifecycle operations
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for GET /caches
#[derive(Debug, Clone, Serialize)]
pub struct CachesResponse {
    pub caches: Vec<CacheInfo>,
}

/// Response body for GET /caches/:cache/stores
#[derive(Debug, Clone, Serialize)]
pub struct StoresResponse {
    pub cache: String,
    pub stores: Vec<StoreInfo>,
}

/// Response body for GET /caches/:cache/keys
#[derive(Debug, Clone, Serialize)]
pub struct KeysResponse {
    pub cache: String,
    pub keys: Vec<String>,
}

/// Response body for GET /caches/:cache/all
#[derive(Debug, Clone, Serialize)]
pub struct AllResponse {
    pub cache: String,
    pub data: BTreeMap<String, String>,
}

/// Response body for GET /caches/:cache/search
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub cache: String,
    pub pattern: String,
    pub regex: bool,
    /// Live entries whose key matched
    pub data: BTreeMap<String, String>,
}

/// Response body for GET /ttl/:key and GET /caches/:cache/ttl/:key
#[derive(Debug, Clone, Serialize)]
pub struct TtlResponse {
    pub key: String,
    /// Whole seconds left; null when the key never expires
    pub ttl: Option<u64>,
}

/// Response body for POST /caches/:cache/clear
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub cache: String,
    pub removed: usize,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Reads that returned a live value
    pub hits: u64,
    /// Reads of missing or expired keys
    pub misses: u64,
    /// Entries reclaimed by TTL
    pub expirations: u64,
    /// Entries currently stored across every store
    pub total_entries: usize,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Number of named caches, including the default one
    pub caches: usize,
    /// Event callbacks that failed and were suppressed
    pub event_failures: u64,
    /// Counters broken down by cache name
    pub per_cache: BTreeMap<String, CacheStatsResponse>,
}

impl StatsResponse {
    pub fn new(
        stats: &StoreStats,
        per_cache: BTreeMap<String, StoreStats>,
        event_failures: u64,
    ) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
            caches: per_cache.len(),
            event_failures,
            per_cache: per_cache
                .into_iter()
                .map(|(name, stats)| {
                    let resp = CacheStatsResponse::new(&name, &stats);
                    (name, resp)
                })
                .collect(),
        }
    }
}

/// Response body for GET|DELETE /caches/:cache/stats
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub cache: String,
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub total_entries: usize,
    pub hit_rate: f64,
}

impl CacheStatsResponse {
    pub fn new(cache: impl Into<String>, stats: &StoreStats) -> Self {
        Self {
            cache: cache.into(),
            hits: stats.hits,
            misses: stats.misses,
            expirations: stats.expirations,
            total_entries: stats.total_entries,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
