//! Event Bus Module
//!
//! Synchronous publish/subscribe registry keyed by event kind and optional
//! cache name.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::events::{EventContext, EventKind};

/// Subscriber callback. Returning an error is logged and suppressed.
pub type Callback = Arc<dyn Fn(&EventContext) -> anyhow::Result<()> + Send + Sync>;

// == Subscription Handle ==
/// Opaque handle returned by [`EventBus::subscribe`].
///
/// Handles are issued in increasing order, which is also the dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Subscription {
    id: SubscriptionId,
    callback: Callback,
}

type SubscriberKey = (EventKind, Option<String>);

// == Event Bus ==
/// Registry of subscribers with synchronous, in-order dispatch.
///
/// `publish` runs every matching callback on the calling thread. The
/// subscriber table is only read-locked long enough to copy out the matching
/// callbacks, so callbacks may themselves subscribe or unsubscribe.
pub struct EventBus {
    subscribers: RwLock<HashMap<SubscriberKey, Vec<Subscription>>>,
    next_id: AtomicU64,
    failures: AtomicU64,
}

impl EventBus {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            failures: AtomicU64::new(0),
        }
    }

    // == Subscribe ==
    /// Registers `callback` for `kind`.
    ///
    /// With `cache_name` set the callback only fires for events whose context
    /// names that cache; without it the callback fires for every cache.
    pub fn subscribe<F>(&self, kind: EventKind, callback: F, cache_name: Option<&str>) -> SubscriptionId
    where
        F: Fn(&EventContext) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let key = (kind, cache_name.map(str::to_string));

        self.subscribers.write().entry(key).or_default().push(Subscription {
            id,
            callback: Arc::new(callback),
        });

        id
    }

    // == Unsubscribe ==
    /// Removes a subscription. Returns false if the handle was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let mut removed = false;

        subscribers.retain(|_, list| {
            let before = list.len();
            list.retain(|sub| sub.id != id);
            removed |= list.len() != before;
            !list.is_empty()
        });

        removed
    }

    // == Publish ==
    /// Delivers `context` to every matching subscriber in registration order.
    ///
    /// A callback that returns an error or panics is recorded and skipped;
    /// delivery continues with the remaining subscribers.
    pub fn publish(&self, context: &EventContext) {
        let matching = self.matching(context);

        for (id, callback) in matching {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(context))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        subscription = ?id,
                        event = %context.kind,
                        cache = %context.cache_name,
                        "Event callback failed: {:#}",
                        err
                    );
                }
                Err(_) => {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        subscription = ?id,
                        event = %context.kind,
                        cache = %context.cache_name,
                        "Event callback panicked"
                    );
                }
            }
        }
    }

    fn matching(&self, context: &EventContext) -> Vec<(SubscriptionId, Callback)> {
        let subscribers = self.subscribers.read();
        let global = subscribers.get(&(context.kind, None));
        let scoped = subscribers.get(&(context.kind, Some(context.cache_name.clone())));

        let mut matching: Vec<(SubscriptionId, Callback)> = global
            .into_iter()
            .chain(scoped)
            .flatten()
            .map(|sub| (sub.id, Arc::clone(&sub.callback)))
            .collect();
        matching.sort_by_key(|(id, _)| *id);
        matching
    }

    // == Diagnostics ==
    /// Number of callback invocations that failed or panicked so far.
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().values().map(Vec::len).sum()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .field("failures", &self.failure_count())
            .finish()
    }
}
