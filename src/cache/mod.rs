//! Cache Module
//!
//! In-memory store engine: expiring stores, named caches and nested stores.

mod entry;
mod nested;
mod registry;
mod search;
mod stats;
mod store;


use crate::error::{CacheError, Result};

// Re-export public types
pub use entry::{current_timestamp_ms, Entry};
pub use nested::{Address, NestedStoreIndex, StoreInfo, ADDRESS_SEPARATOR};
pub use registry::{CacheInfo, CacheRegistry, CacheSnapshot, NamedCache, DEFAULT_CACHE};
pub use search::KeyPattern;
pub use stats::StoreStats;
pub use store::ExpiringStore;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

/// Characters a cache or store name may not contain. Names end up in
/// backup file names, so path separators are excluded as well.
const FORBIDDEN_NAME_CHARS: [char; 3] = [ADDRESS_SEPARATOR, '/', '\\'];

/// Cache and store names must be non-empty and free of the address separator
/// and path separators.
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CacheError::InvalidName(format!("{} name cannot be empty", kind)));
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_NAME_CHARS.contains(c)) {
        return Err(CacheError::InvalidName(format!(
            "{} name '{}' cannot contain '{}'",
            kind, name, c
        )));
    }
    Ok(())
}
