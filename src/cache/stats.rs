//! Store Statistics Module
//!
//! Tracks per-store read and expiry counters.

use serde::Serialize;

// == Store Stats ==
/// Counters kept by each expiring store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Reads that returned a live value
    pub hits: u64,
    /// Reads of a missing or expired key
    pub misses: u64,
    /// Entries reclaimed because their TTL elapsed (read path or sweep)
    pub expirations: u64,
    /// Current number of physically stored entries
    pub total_entries: usize,
}

impl StoreStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }

    /// Zeroes the read and expiry counters. The entry count is a gauge and
    /// is left alone.
    pub fn reset_counters(&mut self) {
        self.hits = 0;
        self.misses = 0;
        self.expirations = 0;
    }

    // == Merge ==
    /// Adds another store's counters into this one.
    pub fn merge(&mut self, other: &StoreStats) {
        self.hits += other.hits;
        self.misses += other.misses;
        self.expirations += other.expirations;
        self.total_entries += other.total_entries;
    }
}
