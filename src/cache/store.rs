//! Expiring Store Module
//!
//! A single namespace of keys with TTL enforcement. Every read and write of the
//! entry map happens under the store's own lock; events are published after
//! the lock is released.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::entry::current_timestamp_ms;
use crate::cache::{Entry, KeyPattern, StoreStats};
use crate::events::{EventBus, EventContext, EventKind};

#[derive(Debug, Default)]
struct StoreState {
    entries: HashMap<String, Entry>,
    stats: StoreStats,
}

impl StoreState {
    fn sync_len(&mut self) {
        let len = self.entries.len();
        self.stats.set_total_entries(len);
    }
}

// == Deferred Events ==
/// The result of a store mutation together with the events it raised.
///
/// Callers that hold a registry or index lock around the mutation keep the
/// events back until every lock is released, then call [`Pending::publish`].
#[must_use = "the events of a mutation must be published"]
#[derive(Debug)]
pub(crate) struct Pending<T> {
    value: T,
    events: Vec<EventContext>,
}

impl<T> Pending<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            events: Vec::new(),
        }
    }

    fn with_event(mut self, event: EventContext) -> Self {
        self.events.push(event);
        self
    }

    /// Delivers the events in order and returns the operation's result.
    pub(crate) fn publish(self, bus: &EventBus) -> T {
        for event in &self.events {
            bus.publish(event);
        }
        self.value
    }
}

// == Expiring Store ==
/// Key-value map with per-entry expiration and an optional default TTL.
#[derive(Debug)]
pub struct ExpiringStore {
    /// Owning cache, reported in every event
    cache_name: String,
    /// Set for stores living in a cache's nested index
    store_name: Option<String>,
    /// TTL in seconds applied when `set` is called without one
    default_ttl: Option<u64>,
    state: Mutex<StoreState>,
    events: Arc<EventBus>,
}

impl ExpiringStore {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `cache_name` - Cache reported in emitted events
    /// * `store_name` - Nested store name, None for a cache's root store
    /// * `default_ttl` - TTL in seconds for entries set without one
    /// * `events` - Bus that receives this store's events
    pub fn new(
        cache_name: impl Into<String>,
        store_name: Option<String>,
        default_ttl: Option<u64>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            cache_name: cache_name.into(),
            store_name,
            default_ttl,
            state: Mutex::new(StoreState::default()),
            events,
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }

    pub fn store_name(&self) -> Option<&str> {
        self.store_name.as_deref()
    }

    pub fn default_ttl(&self) -> Option<u64> {
        self.default_ttl
    }

    // == Set ==
    /// Stores a value, overwriting any existing entry and resetting its TTL.
    ///
    /// The TTL is `ttl` if given, else the store's default, else none.
    /// Returns the previous live value.
    pub fn set(&self, key: String, value: String, ttl: Option<u64>) -> Option<String> {
        self.set_deferred(key, value, ttl).publish(&self.events)
    }

    pub(crate) fn set_deferred(
        &self,
        key: String,
        value: String,
        ttl: Option<u64>,
    ) -> Pending<Option<String>> {
        let now = current_timestamp_ms();
        let entry = Entry::new(value.clone(), ttl.or(self.default_ttl), now);

        let previous = {
            let mut state = self.state.lock();
            let previous = state.entries.insert(key.clone(), entry);
            state.sync_len();
            previous
        };

        let old_value = previous
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value);

        let event = self.event(EventKind::Set, &key, Some(value), old_value.clone());
        Pending::new(old_value).with_event(event)
    }

    // == Get ==
    /// Returns the value for `key` if present and not expired.
    ///
    /// An expired entry is removed by the read and reported as EXPIRE.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_deferred(key).publish(&self.events)
    }

    pub(crate) fn get_deferred(&self, key: &str) -> Pending<Option<String>> {
        let now = current_timestamp_ms();

        let expired = {
            let mut state = self.state.lock();
            let lookup = state
                .entries
                .get(key)
                .map(|entry| (entry.is_expired_at(now), entry.value.clone()));

            match lookup {
                None => {
                    state.stats.record_miss();
                    return Pending::new(None);
                }
                Some((false, value)) => {
                    state.stats.record_hit();
                    return Pending::new(Some(value));
                }
                Some((true, _)) => {
                    let removed = state.entries.remove(key);
                    state.stats.record_miss();
                    state.stats.record_expirations(1);
                    state.sync_len();
                    removed
                }
            }
        };

        let mut pending = Pending::new(None);
        if let Some(entry) = expired {
            debug!(cache = %self.cache_name, key, "lazily expired on read");
            pending = pending.with_event(self.event(EventKind::Expire, key, None, Some(entry.value)));
        }
        pending
    }

    /// Returns a copy of the live entry for `key` without touching stats.
    pub fn get_entry(&self, key: &str) -> Option<Entry> {
        let now = current_timestamp_ms();
        let state = self.state.lock();
        state
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .cloned()
    }

    // == Delete ==
    /// Removes `key` and returns its previous value.
    ///
    /// Deleting an absent key is a no-op that returns None. An entry that had
    /// already expired is reclaimed as EXPIRE and also reported as absent.
    pub fn delete(&self, key: &str) -> Option<String> {
        self.delete_deferred(key).publish(&self.events)
    }

    pub(crate) fn delete_deferred(&self, key: &str) -> Pending<Option<String>> {
        let now = current_timestamp_ms();

        let removed = {
            let mut state = self.state.lock();
            let removed = state.entries.remove(key);
            if removed.as_ref().is_some_and(|e| e.is_expired_at(now)) {
                state.stats.record_expirations(1);
            }
            state.sync_len();
            removed
        };

        match removed {
            Some(entry) if entry.is_expired_at(now) => Pending::new(None)
                .with_event(self.event(EventKind::Expire, key, None, Some(entry.value))),
            Some(entry) => {
                let event = self.event(EventKind::Delete, key, None, Some(entry.value.clone()));
                Pending::new(Some(entry.value)).with_event(event)
            }
            None => Pending::new(None),
        }
    }

    // == Expire ==
    /// Re-arms the TTL of a live key to `ttl` seconds from now.
    ///
    /// Emits SET with the unchanged value. Returns false if the key is absent.
    pub fn expire(&self, key: &str, ttl: u64) -> bool {
        self.expire_deferred(key, ttl).publish(&self.events)
    }

    pub(crate) fn expire_deferred(&self, key: &str, ttl: u64) -> Pending<bool> {
        let now = current_timestamp_ms();

        let value = {
            let mut state = self.state.lock();
            match state.entries.get_mut(key) {
                Some(entry) if !entry.is_expired_at(now) => {
                    *entry = Entry::new(std::mem::take(&mut entry.value), Some(ttl), now);
                    Some(entry.value.clone())
                }
                _ => None,
            }
        };

        match value {
            Some(value) => Pending::new(true)
                .with_event(self.event(EventKind::Set, key, Some(value.clone()), Some(value))),
            None => Pending::new(false),
        }
    }

    /// Remaining TTL of a live key in seconds.
    ///
    /// Returns None if the key is absent, `Some(None)` if it never expires.
    pub fn ttl(&self, key: &str) -> Option<Option<u64>> {
        let now = current_timestamp_ms();
        let state = self.state.lock();
        state
            .entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.ttl_remaining_secs_at(now))
    }

    // == Clear ==
    /// Removes every entry.
    ///
    /// Emits one DELETE per removed live entry (EXPIRE for entries that had
    /// already expired), then a single CLEAR. Returns the number of live
    /// entries removed.
    pub fn clear(&self) -> usize {
        self.clear_deferred().publish(&self.events)
    }

    pub(crate) fn clear_deferred(&self) -> Pending<usize> {
        let now = current_timestamp_ms();

        let mut drained: Vec<(String, Entry)> = {
            let mut state = self.state.lock();
            let drained: Vec<_> = state.entries.drain().collect();
            let expired = drained.iter().filter(|(_, e)| e.is_expired_at(now)).count();
            state.stats.record_expirations(expired);
            state.sync_len();
            drained
        };
        drained.sort_by(|a, b| a.0.cmp(&b.0));

        let mut removed = 0;
        let mut events = Vec::with_capacity(drained.len() + 1);
        for (key, entry) in drained {
            if entry.is_expired_at(now) {
                events.push(self.event(EventKind::Expire, &key, None, Some(entry.value)));
            } else {
                removed += 1;
                events.push(self.event(EventKind::Delete, &key, None, Some(entry.value)));
            }
        }
        events.push(
            EventContext::new(EventKind::Clear, self.cache_name.clone())
                .with_store(self.store_name.clone()),
        );

        Pending { value: removed, events }
    }

    // == Sweep ==
    /// Removes every entry expired at `now` and emits one EXPIRE per removal.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: u64) -> usize {
        self.sweep_deferred(now).publish(&self.events)
    }

    pub(crate) fn sweep_deferred(&self, now: u64) -> Pending<usize> {
        let mut expired: Vec<(String, Entry)> = {
            let mut state = self.state.lock();
            let keys: Vec<String> = state
                .entries
                .iter()
                .filter(|(_, entry)| entry.is_expired_at(now))
                .map(|(key, _)| key.clone())
                .collect();

            let removed: Vec<_> = keys
                .into_iter()
                .filter_map(|key| state.entries.remove_entry(&key))
                .collect();
            state.stats.record_expirations(removed.len());
            state.sync_len();
            removed
        };
        expired.sort_by(|a, b| a.0.cmp(&b.0));

        let events = expired
            .into_iter()
            .map(|(key, entry)| self.event(EventKind::Expire, &key, None, Some(entry.value)))
            .collect::<Vec<_>>();
        Pending {
            value: events.len(),
            events,
        }
    }

    // == Keys ==
    /// Returns the live keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let now = current_timestamp_ms();
        let state = self.state.lock();
        let mut keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    // == Search ==
    /// Returns the live entries whose key matches `pattern`, ordered by key.
    pub fn search(&self, pattern: &KeyPattern) -> BTreeMap<String, String> {
        let now = current_timestamp_ms();
        let state = self.state.lock();
        state
            .entries
            .iter()
            .filter(|(key, entry)| !entry.is_expired_at(now) && pattern.matches(key))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Returns the live keys holding exactly `value`, sorted.
    pub fn find_by_value(&self, value: &str) -> Vec<String> {
        let now = current_timestamp_ms();
        let state = self.state.lock();
        let mut keys: Vec<String> = state
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now) && entry.value == value)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    // == Get All ==
    /// Returns a copy of every live key-value pair, ordered by key.
    pub fn get_all(&self) -> BTreeMap<String, String> {
        let now = current_timestamp_ms();
        let state = self.state.lock();
        state
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    // == Length ==
    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        let now = current_timestamp_ms();
        let state = self.state.lock();
        state
            .entries
            .values()
            .filter(|entry| !entry.is_expired_at(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // == Stats ==
    pub fn stats(&self) -> StoreStats {
        self.state.lock().stats.clone()
    }

    pub fn reset_stats(&self) {
        self.state.lock().stats.reset_counters();
    }

    fn event(
        &self,
        kind: EventKind,
        key: &str,
        value: Option<String>,
        old_value: Option<String>,
    ) -> EventContext {
        EventContext::new(kind, self.cache_name.clone())
            .with_store(self.store_name.clone())
            .with_key(key)
            .with_value(value)
            .with_old_value(old_value)
    }
}
