//! Cache Registry Module
//!
//! Owns every named cache, routes key operations to the right store and runs
//! the expiration sweep across all of them.
//!
//! # Locking
//! The cache table sits behind a registry-level `RwLock`. A mutating key
//! operation takes it for reading first, then the nested index lock if the
//! key lives in a nested store, then the single store lock, and releases them
//! in reverse order. `delete_cache` and `delete_store` take the write side, so
//! they wait for in-flight mutations and no write lands in a detached store.
//! Events are published only after every lock is released.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::store::Pending;
use crate::cache::{
    validate_name, Address, ExpiringStore, KeyPattern, NestedStoreIndex, StoreInfo, StoreStats,
};
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::events::{EventBus, EventContext, EventKind};

/// Name of the cache that always exists and cannot be deleted.
pub const DEFAULT_CACHE: &str = "default";

// == Named Cache ==
/// A top-level namespace: a root store plus its nested stores.
#[derive(Debug)]
pub struct NamedCache {
    name: String,
    store: Arc<ExpiringStore>,
    nested: NestedStoreIndex,
}

impl NamedCache {
    fn new(name: &str, default_ttl: Option<u64>, events: &Arc<EventBus>) -> Self {
        Self {
            name: name.to_string(),
            store: Arc::new(ExpiringStore::new(name, None, default_ttl, Arc::clone(events))),
            nested: NestedStoreIndex::new(name, Arc::clone(events)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<ExpiringStore> {
        &self.store
    }

    pub fn nested(&self) -> &NestedStoreIndex {
        &self.nested
    }
}

/// Listing row for a named cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub name: String,
    pub item_count: usize,
}

/// Live contents of one cache's root store, without TTL metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub cache_name: String,
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct RegistryState {
    caches: HashMap<String, Arc<NamedCache>>,
    /// Cache names in creation order
    order: Vec<String>,
}

// == Cache Registry ==
/// Registry of named caches, seeded with [`DEFAULT_CACHE`].
#[derive(Debug)]
pub struct CacheRegistry {
    /// TTL in seconds applied to root-store keys set without one
    default_ttl: Option<u64>,
    state: RwLock<RegistryState>,
    /// Held for the duration of a sweep so sweeps never overlap
    sweep_guard: Mutex<()>,
    events: Arc<EventBus>,
}

impl CacheRegistry {
    // == Constructor ==
    /// Creates a registry containing only the default cache.
    pub fn new(default_ttl: Option<u64>, events: Arc<EventBus>) -> Self {
        let default = Arc::new(NamedCache::new(DEFAULT_CACHE, default_ttl, &events));
        let mut state = RegistryState::default();
        state.caches.insert(DEFAULT_CACHE.to_string(), default);
        state.order.push(DEFAULT_CACHE.to_string());

        Self {
            default_ttl,
            state: RwLock::new(state),
            sweep_guard: Mutex::new(()),
            events,
        }
    }

    /// Creates a registry from configuration with a fresh event bus.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.default_ttl(), Arc::new(EventBus::new()))
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    // == Cache Lifecycle ==
    /// Creates an empty cache. Emits CREATE_CACHE.
    pub fn create_cache(&self, name: &str) -> Result<Arc<NamedCache>> {
        validate_name("cache", name)?;

        let cache = {
            let mut state = self.state.write();
            if state.caches.contains_key(name) {
                return Err(CacheError::AlreadyExists(format!("cache '{}'", name)));
            }
            let cache = Arc::new(NamedCache::new(name, self.default_ttl, &self.events));
            state.caches.insert(name.to_string(), Arc::clone(&cache));
            state.order.push(name.to_string());
            cache
        };

        info!(cache = name, "Cache created");
        self.events
            .publish(&EventContext::new(EventKind::CreateCache, name));
        Ok(cache)
    }

    /// Returns the cache, creating it first if it does not exist.
    pub fn ensure_cache(&self, name: &str) -> Result<Arc<NamedCache>> {
        match self.cache(name) {
            Ok(cache) => Ok(cache),
            Err(CacheError::NotFound(_)) => match self.create_cache(name) {
                // Lost a race with a concurrent create
                Err(CacheError::AlreadyExists(_)) => self.cache(name),
                other => other,
            },
            Err(err) => Err(err),
        }
    }

    /// Deletes a cache with its nested stores.
    ///
    /// Emits a single DELETE_CACHE; the dropped keys produce no events.
    pub fn delete_cache(&self, name: &str) -> Result<()> {
        if name == DEFAULT_CACHE {
            return Err(CacheError::Protected(format!(
                "cache '{}' cannot be deleted",
                DEFAULT_CACHE
            )));
        }

        let removed = {
            let mut state = self.state.write();
            let removed = state.caches.remove(name);
            if removed.is_some() {
                state.order.retain(|n| n != name);
            }
            removed
        };

        match removed {
            Some(_) => {
                info!(cache = name, "Cache deleted");
                self.events
                    .publish(&EventContext::new(EventKind::DeleteCache, name));
                Ok(())
            }
            None => Err(CacheError::cache_not_found(name)),
        }
    }

    /// Lists caches in creation order with their live item counts.
    pub fn list_caches(&self) -> Vec<CacheInfo> {
        self.caches()
            .into_iter()
            .map(|cache| CacheInfo {
                name: cache.name().to_string(),
                item_count: cache.store().len(),
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.read().caches.contains_key(name)
    }

    /// Looks up a cache handle.
    pub fn cache(&self, name: &str) -> Result<Arc<NamedCache>> {
        self.state
            .read()
            .caches
            .get(name)
            .cloned()
            .ok_or_else(|| CacheError::cache_not_found(name))
    }

    /// Handles to every cache in creation order.
    fn caches(&self) -> Vec<Arc<NamedCache>> {
        let state = self.state.read();
        state
            .order
            .iter()
            .filter_map(|name| state.caches.get(name).cloned())
            .collect()
    }

    fn root_store(&self, cache: &str) -> Result<Arc<ExpiringStore>> {
        Ok(Arc::clone(self.cache(cache)?.store()))
    }

    /// Runs a mutation on the cache's root store with the registry read lock
    /// held, then publishes its events.
    fn mutate_root<T>(
        &self,
        cache: &str,
        op: impl FnOnce(&ExpiringStore) -> Pending<T>,
    ) -> Result<T> {
        let pending = {
            let state = self.state.read();
            let named = state
                .caches
                .get(cache)
                .ok_or_else(|| CacheError::cache_not_found(cache))?;
            op(named.store().as_ref())
        };
        Ok(pending.publish(&self.events))
    }

    // == Key Operations ==
    /// Sets `key` in the cache's root store. Returns the previous value.
    pub fn set(&self, cache: &str, key: &str, value: &str, ttl: Option<u64>) -> Result<Option<String>> {
        self.mutate_root(cache, |store| {
            store.set_deferred(key.to_string(), value.to_string(), ttl)
        })
    }

    pub fn get(&self, cache: &str, key: &str) -> Result<Option<String>> {
        self.mutate_root(cache, |store| store.get_deferred(key))
    }

    pub fn delete(&self, cache: &str, key: &str) -> Result<Option<String>> {
        self.mutate_root(cache, |store| store.delete_deferred(key))
    }

    pub fn expire(&self, cache: &str, key: &str, ttl: u64) -> Result<bool> {
        self.mutate_root(cache, |store| store.expire_deferred(key, ttl))
    }

    pub fn ttl(&self, cache: &str, key: &str) -> Result<Option<Option<u64>>> {
        Ok(self.root_store(cache)?.ttl(key))
    }

    /// Empties the cache's root store. Returns the number of keys removed.
    pub fn clear(&self, cache: &str) -> Result<usize> {
        self.mutate_root(cache, |store| store.clear_deferred())
    }

    pub fn keys(&self, cache: &str) -> Result<Vec<String>> {
        Ok(self.root_store(cache)?.keys())
    }

    pub fn get_all(&self, cache: &str) -> Result<BTreeMap<String, String>> {
        Ok(self.root_store(cache)?.get_all())
    }

    // == Search ==
    /// Live entries of the cache's root store whose key matches `pattern`.
    pub fn search(&self, cache: &str, pattern: &KeyPattern) -> Result<BTreeMap<String, String>> {
        Ok(self.root_store(cache)?.search(pattern))
    }

    /// Keys of the cache's root store holding exactly `value`.
    pub fn find_by_value(&self, cache: &str, value: &str) -> Result<Vec<String>> {
        Ok(self.root_store(cache)?.find_by_value(value))
    }

    // == Nested Stores ==
    pub fn create_store(&self, cache: &str, store: &str, ttl: Option<u64>) -> Result<()> {
        self.cache(cache)?.nested().create(store, ttl)?;
        Ok(())
    }

    pub fn delete_store(&self, cache: &str, store: &str) -> Result<()> {
        self.cache(cache)?.nested().delete(store)
    }

    pub fn list_stores(&self, cache: &str) -> Result<Vec<StoreInfo>> {
        Ok(self.cache(cache)?.nested().list())
    }

    // == Compound Addresses ==
    /// Runs a mutation on the store `address` points at, holding the
    /// registry and nested index read locks, then publishes its events.
    fn mutate_at<T>(
        &self,
        address: &str,
        op: impl FnOnce(&ExpiringStore, &str) -> Pending<T>,
    ) -> Result<T> {
        let address = Address::parse(address)?;
        let pending = {
            let state = self.state.read();
            let named = state
                .caches
                .get(address.cache)
                .ok_or_else(|| CacheError::cache_not_found(address.cache))?;
            match address.store {
                Some(store) => named
                    .nested()
                    .with_store(store, |store| op(store, address.key))?,
                None => op(named.store().as_ref(), address.key),
            }
        };
        Ok(pending.publish(&self.events))
    }

    pub fn set_at(&self, address: &str, value: &str, ttl: Option<u64>) -> Result<Option<String>> {
        self.mutate_at(address, |store, key| {
            store.set_deferred(key.to_string(), value.to_string(), ttl)
        })
    }

    pub fn get_at(&self, address: &str) -> Result<Option<String>> {
        self.mutate_at(address, |store, key| store.get_deferred(key))
    }

    pub fn delete_at(&self, address: &str) -> Result<Option<String>> {
        self.mutate_at(address, |store, key| store.delete_deferred(key))
    }

    // == Sweep ==
    /// Sweeps every live store, root and nested, at `now`.
    ///
    /// Concurrent callers are serialized. Returns the total number of entries
    /// removed.
    pub fn sweep_all(&self, now: u64) -> usize {
        let _guard = self.sweep_guard.lock();

        let pending: Vec<Pending<usize>> = {
            let state = self.state.read();
            state
                .order
                .iter()
                .filter_map(|name| state.caches.get(name))
                .flat_map(|cache| {
                    let mut swept = vec![cache.store().sweep_deferred(now)];
                    swept.extend(cache.nested().map_stores(|store| store.sweep_deferred(now)));
                    swept
                })
                .collect()
        };

        let removed: usize = pending
            .into_iter()
            .map(|swept| swept.publish(&self.events))
            .sum();

        debug!(removed, "Sweep pass finished");
        removed
    }

    /// Handles to every root and nested store.
    pub fn all_stores(&self) -> Vec<Arc<ExpiringStore>> {
        self.caches()
            .into_iter()
            .flat_map(|cache| {
                let mut stores = vec![Arc::clone(cache.store())];
                stores.extend(cache.nested().stores());
                stores
            })
            .collect()
    }

    // == Stats ==
    /// Counters summed over every store.
    pub fn stats(&self) -> StoreStats {
        let mut total = StoreStats::new();
        for store in self.all_stores() {
            total.merge(&store.stats());
        }
        total
    }

    /// Counters of one cache, its root store and nested stores combined.
    pub fn cache_stats(&self, cache: &str) -> Result<StoreStats> {
        Ok(Self::combined_stats(&*self.cache(cache)?))
    }

    /// Per-cache counters keyed by cache name.
    pub fn all_cache_stats(&self) -> BTreeMap<String, StoreStats> {
        self.caches()
            .into_iter()
            .map(|cache| (cache.name().to_string(), Self::combined_stats(&cache)))
            .collect()
    }

    /// Zeroes the read and expiry counters of one cache and its nested stores.
    pub fn reset_stats(&self, cache: &str) -> Result<()> {
        let cache = self.cache(cache)?;
        cache.store().reset_stats();
        for store in cache.nested().stores() {
            store.reset_stats();
        }
        info!(cache = cache.name(), "Cache stats reset");
        Ok(())
    }

    fn combined_stats(cache: &NamedCache) -> StoreStats {
        let mut total = cache.store().stats();
        for store in cache.nested().stores() {
            total.merge(&store.stats());
        }
        total
    }

    // == Snapshot / Restore ==
    /// Returns the live root-store contents of every cache, in creation order.
    pub fn snapshot(&self) -> Vec<CacheSnapshot> {
        self.caches()
            .into_iter()
            .map(|cache| CacheSnapshot {
                cache_name: cache.name().to_string(),
                data: cache.store().get_all(),
            })
            .collect()
    }

    /// Repopulates a cache from a snapshot, creating it if needed.
    ///
    /// Entries are set without an explicit TTL. Returns the number restored.
    pub fn restore(&self, snapshot: &CacheSnapshot) -> Result<usize> {
        self.ensure_cache(&snapshot.cache_name)?;
        for (key, value) in &snapshot.data {
            self.set(&snapshot.cache_name, key, value, None)?;
        }
        info!(cache = %snapshot.cache_name, entries = snapshot.data.len(), "Cache restored");
        Ok(snapshot.data.len())
    }
}
