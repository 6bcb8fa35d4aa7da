//! Cache Entry Module
//!
//! Defines the structure for individual entries with TTL support, and the one
//! expiry predicate shared by the read path and the sweep.

use std::time::{SystemTime, UNIX_EPOCH};

// == Entry ==
/// A single stored value with its timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The stored value
    pub value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl Entry {
    // == Constructor ==
    /// Creates an entry stamped at `now` with an optional TTL in seconds.
    ///
    /// A TTL of zero produces an entry that is already expired.
    pub fn new(value: String, ttl_seconds: Option<u64>, now: u64) -> Self {
        let expires_at = ttl_seconds.map(|ttl| now.saturating_add(ttl.saturating_mul(1000)));

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry is expired at `now`.
    ///
    /// An entry is expired once `expires_at <= now`, so an entry set to
    /// expire "now" is already gone.
    pub fn is_expired_at(&self, now: u64) -> bool {
        match self.expires_at {
            Some(expires) => expires <= now,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds at `now`, or None if the entry
    /// never expires.
    pub fn ttl_remaining_ms_at(&self, now: u64) -> Option<u64> {
        self.expires_at.map(|expires| expires.saturating_sub(now))
    }

    /// Returns remaining TTL in whole seconds at `now`, or None if the entry
    /// never expires.
    pub fn ttl_remaining_secs_at(&self, now: u64) -> Option<u64> {
        self.ttl_remaining_ms_at(now).map(|ms| ms / 1000)
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
