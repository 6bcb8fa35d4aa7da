//! Expiration Sweep Task
//!
//! Background task that periodically removes expired entries from every store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{current_timestamp_ms, CacheRegistry};

/// Spawns a background task that periodically sweeps every root and nested
/// store of the registry.
///
/// Each pass runs on the blocking pool, since it takes store locks and
/// publishes EXPIRE events synchronously. Passes are awaited one at a time and
/// `sweep_all` is itself serialized, so sweeps never overlap.
///
/// # Arguments
/// * `registry` - Shared registry to sweep
/// * `sweep_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let registry = Arc::new(CacheRegistry::from_config(&config));
/// let sweep_handle = spawn_sweep_task(registry.clone(), 1);
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(registry: Arc<CacheRegistry>, sweep_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(sweep_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiration sweep task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let registry = Arc::clone(&registry);
            let pass = tokio::task::spawn_blocking(move || registry.sweep_all(current_timestamp_ms()));

            match pass.await {
                Ok(removed) if removed > 0 => {
                    info!("Expiration sweep: removed {} expired entries", removed);
                }
                Ok(_) => debug!("Expiration sweep: no expired entries found"),
                Err(err) => warn!("Expiration sweep pass failed: {}", err),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::DEFAULT_CACHE;
    use crate::events::{EventBus, EventKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn registry() -> Arc<CacheRegistry> {
        Arc::new(CacheRegistry::new(None, Arc::new(EventBus::new())))
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired_entries() {
        let registry = registry();
        let expired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&expired);
        registry.events().subscribe(
            EventKind::Expire,
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            None,
        );

        registry.set(DEFAULT_CACHE, "expire_soon", "value", Some(1)).unwrap();
        registry.create_cache("users").unwrap();
        registry.create_store("users", "sessions", Some(1)).unwrap();
        registry.set_at("users:sessions:s1", "tok", None).unwrap();

        let handle = spawn_sweep_task(registry.clone(), 1);

        // Wait for entries to expire and a sweep to run
        tokio::time::sleep(Duration::from_millis(2500)).await;

        // Removed by the sweep, not by a read
        assert_eq!(expired.load(Ordering::SeqCst), 2);
        assert_eq!(registry.stats().total_entries, 0);

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_preserves_valid_entries() {
        let registry = registry();
        registry.set(DEFAULT_CACHE, "long_lived", "value", Some(3600)).unwrap();

        let handle = spawn_sweep_task(registry.clone(), 1);

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert_eq!(
            registry.get(DEFAULT_CACHE, "long_lived").unwrap().as_deref(),
            Some("value")
        );

        handle.abort();
    }

    #[tokio::test]
    async fn test_sweep_task_can_be_aborted() {
        let handle = spawn_sweep_task(registry(), 1);

        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.is_finished(), "Task should be finished after abort");
    }
}
