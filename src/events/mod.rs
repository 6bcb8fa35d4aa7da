//! Events Module
//!
//! Mutation events and the synchronous bus that delivers them to observers.

mod bus;
mod context;

use tracing::debug;

pub use bus::{Callback, EventBus, SubscriptionId};
pub use context::{EventContext, EventKind};

/// Every event kind, in declaration order.
pub const ALL_EVENT_KINDS: [EventKind; 6] = [
    EventKind::Set,
    EventKind::Delete,
    EventKind::Clear,
    EventKind::CreateCache,
    EventKind::DeleteCache,
    EventKind::Expire,
];

/// Attaches a global subscriber that traces every event at debug level.
///
/// Returns the handles so the caller can detach it again.
pub fn log_events(bus: &EventBus) -> Vec<SubscriptionId> {
    ALL_EVENT_KINDS
        .iter()
        .map(|kind| {
            bus.subscribe(
                *kind,
                |ctx: &EventContext| {
                    debug!(
                        event = %ctx.kind,
                        cache = %ctx.cache_name,
                        store = ctx.store_name.as_deref().unwrap_or("-"),
                        key = ctx.key.as_deref().unwrap_or("-"),
                        "cache event"
                    );
                    Ok(())
                },
                None,
            )
        })
        .collect()
}

/// Captures every event published on `bus`, for assertions in tests.
#[cfg(test)]
pub(crate) fn record_all(bus: &EventBus) -> std::sync::Arc<parking_lot::Mutex<Vec<EventContext>>> {
    let log = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
    for kind in ALL_EVENT_KINDS {
        let log = std::sync::Arc::clone(&log);
        bus.subscribe(
            kind,
            move |ctx: &EventContext| {
                log.lock().push(ctx.clone());
                Ok(())
            },
            None,
        );
    }
    log
}
