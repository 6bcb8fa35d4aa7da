//! Nested Store Module
//!
//! Per-cache index of named sub-stores and parsing of `cache:store:key`
//! compound addresses.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

use crate::cache::{validate_name, ExpiringStore};
use crate::error::{CacheError, Result};
use crate::events::EventBus;

/// Separator between the segments of a compound address.
pub const ADDRESS_SEPARATOR: char = ':';

// == Store Info ==
/// Listing row for a nested store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreInfo {
    pub name: String,
    pub item_count: usize,
    /// Default TTL in seconds applied to keys set without one
    pub ttl: Option<u64>,
}

// == Nested Store Index ==
/// The nested stores of one cache, keyed by store name.
#[derive(Debug)]
pub struct NestedStoreIndex {
    cache_name: String,
    stores: RwLock<BTreeMap<String, Arc<ExpiringStore>>>,
    events: Arc<EventBus>,
}

impl NestedStoreIndex {
    pub fn new(cache_name: impl Into<String>, events: Arc<EventBus>) -> Self {
        Self {
            cache_name: cache_name.into(),
            stores: RwLock::new(BTreeMap::new()),
            events,
        }
    }

    // == Create ==
    /// Creates an empty store whose entries default to `ttl` seconds.
    pub fn create(&self, store_name: &str, ttl: Option<u64>) -> Result<Arc<ExpiringStore>> {
        validate_name("store", store_name)?;

        let mut stores = self.stores.write();
        if stores.contains_key(store_name) {
            return Err(CacheError::AlreadyExists(format!(
                "store '{}' in cache '{}'",
                store_name, self.cache_name
            )));
        }

        let store = Arc::new(ExpiringStore::new(
            self.cache_name.clone(),
            Some(store_name.to_string()),
            ttl,
            Arc::clone(&self.events),
        ));
        stores.insert(store_name.to_string(), Arc::clone(&store));
        drop(stores);

        info!(cache = %self.cache_name, store = store_name, ttl = ?ttl, "Nested store created");
        Ok(store)
    }

    // == Delete ==
    /// Removes a store and drops its entries without per-key events.
    pub fn delete(&self, store_name: &str) -> Result<()> {
        let removed = self.stores.write().remove(store_name);
        match removed {
            Some(_) => {
                info!(cache = %self.cache_name, store = store_name, "Nested store deleted");
                Ok(())
            }
            None => Err(CacheError::store_not_found(&self.cache_name, store_name)),
        }
    }

    // == Lookup ==
    pub fn get(&self, store_name: &str) -> Result<Arc<ExpiringStore>> {
        self.stores
            .read()
            .get(store_name)
            .cloned()
            .ok_or_else(|| CacheError::store_not_found(&self.cache_name, store_name))
    }

    /// Runs `op` on the named store while holding the index read lock, so a
    /// concurrent `delete` cannot detach the store mid-operation.
    pub fn with_store<T>(&self, store_name: &str, op: impl FnOnce(&ExpiringStore) -> T) -> Result<T> {
        let stores = self.stores.read();
        let store = stores
            .get(store_name)
            .ok_or_else(|| CacheError::store_not_found(&self.cache_name, store_name))?;
        Ok(op(store.as_ref()))
    }

    /// Runs `op` on every store, in name order, under the index read lock.
    pub fn map_stores<T>(&self, op: impl FnMut(&Arc<ExpiringStore>) -> T) -> Vec<T> {
        self.stores.read().values().map(op).collect()
    }

    // == List ==
    /// Lists stores ordered by name.
    pub fn list(&self) -> Vec<StoreInfo> {
        self.stores()
            .into_iter()
            .map(|store| StoreInfo {
                name: store.store_name().unwrap_or_default().to_string(),
                item_count: store.len(),
                ttl: store.default_ttl(),
            })
            .collect()
    }

    /// Returns handles to every store; the index lock is released on return.
    pub fn stores(&self) -> Vec<Arc<ExpiringStore>> {
        self.stores.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.stores.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Address ==
/// A parsed compound key.
///
/// `cache:key` targets the cache's root store and `cache:store:key` a nested
/// store. Only the first two separators split; everything after them is key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Address<'a> {
    pub cache: &'a str,
    pub store: Option<&'a str>,
    pub key: &'a str,
}

impl<'a> Address<'a> {
    pub fn parse(raw: &'a str) -> Result<Self> {
        let invalid = || CacheError::InvalidAddress(raw.to_string());

        let mut parts = raw.splitn(3, ADDRESS_SEPARATOR);
        let cache = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
        let second = parts.next().ok_or_else(invalid)?;

        let address = match parts.next() {
            Some(key) => Address {
                cache,
                store: Some(second),
                key,
            },
            None => Address {
                cache,
                store: None,
                key: second,
            },
        };

        if address.key.is_empty() || address.store.is_some_and(str::is_empty) {
            return Err(invalid());
        }
        Ok(address)
    }
}
