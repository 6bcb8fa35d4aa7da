//! Concurrency Tests
//!
//! Exercises the registry from many threads at once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use radish::cache::{current_timestamp_ms, DEFAULT_CACHE};
use radish::events::{EventContext, EventKind};
use radish::{CacheRegistry, EventBus};

const THREADS: usize = 8;
const KEYS_PER_THREAD: usize = 200;

fn registry() -> Arc<CacheRegistry> {
    Arc::new(CacheRegistry::new(None, Arc::new(EventBus::new())))
}

#[test]
fn test_disjoint_writers_lose_no_updates() {
    let registry = registry();
    let sets = Arc::new(AtomicUsize::new(0));
    {
        let sets = Arc::clone(&sets);
        registry.events().subscribe(
            EventKind::Set,
            move |_: &EventContext| {
                sets.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            None,
        );
    }

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..KEYS_PER_THREAD {
                    let key = format!("t{}-k{}", t, i);
                    let ttl = if i % 2 == 0 { Some(3600) } else { None };
                    registry
                        .set(DEFAULT_CACHE, &key, &format!("v{}", i), ttl)
                        .unwrap();
                    assert_eq!(
                        registry.get(DEFAULT_CACHE, &key).unwrap().as_deref(),
                        Some(format!("v{}", i).as_str())
                    );
                }
                // Drop every fourth key again
                for i in (0..KEYS_PER_THREAD).step_by(4) {
                    let key = format!("t{}-k{}", t, i);
                    assert!(registry.delete(DEFAULT_CACHE, &key).unwrap().is_some());
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let expected = THREADS * (KEYS_PER_THREAD - KEYS_PER_THREAD / 4);
    assert_eq!(registry.keys(DEFAULT_CACHE).unwrap().len(), expected);
    assert_eq!(sets.load(Ordering::SeqCst), THREADS * KEYS_PER_THREAD);

    // Value and expiry always come from the same write
    let store = registry.cache(DEFAULT_CACHE).unwrap().store().clone();
    for t in 0..THREADS {
        for i in (0..KEYS_PER_THREAD).filter(|i| i % 4 != 0) {
            let entry = store.get_entry(&format!("t{}-k{}", t, i)).unwrap();
            assert_eq!(entry.value, format!("v{}", i));
            assert_eq!(entry.expires_at.is_some(), i % 2 == 0);
        }
    }
}

#[test]
fn test_same_key_writers_keep_a_consistent_entry() {
    let registry = registry();

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..KEYS_PER_THREAD {
                    // Even threads write with a TTL, odd threads without
                    let ttl = (t % 2 == 0).then_some(3600);
                    registry
                        .set(DEFAULT_CACHE, "shared", &format!("thread-{}", t), ttl)
                        .unwrap();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }

    let entry = registry
        .cache(DEFAULT_CACHE)
        .unwrap()
        .store()
        .get_entry("shared")
        .unwrap();
    let writer: usize = entry.value.trim_start_matches("thread-").parse().unwrap();
    assert_eq!(entry.expires_at.is_some(), writer % 2 == 0);
}

#[test]
fn test_sweep_races_with_readers() {
    let registry = registry();
    for i in 0..500 {
        let ttl = if i % 2 == 0 { Some(0) } else { None };
        registry
            .set(DEFAULT_CACHE, &format!("k{}", i), "v", ttl)
            .unwrap();
    }

    let expirations = Arc::new(AtomicUsize::new(0));
    {
        let expirations = Arc::clone(&expirations);
        registry.events().subscribe(
            EventKind::Expire,
            move |_: &EventContext| {
                expirations.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            None,
        );
    }

    let sweeper = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || registry.sweep_all(current_timestamp_ms()))
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for i in 0..500 {
                    let value = registry.get(DEFAULT_CACHE, &format!("k{}", i)).unwrap();
                    assert_eq!(value.is_some(), i % 2 == 1);
                }
            })
        })
        .collect();

    sweeper.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    // Each expired entry is reclaimed exactly once, by a read or the sweep
    assert_eq!(expirations.load(Ordering::SeqCst), 250);
    assert_eq!(registry.keys(DEFAULT_CACHE).unwrap().len(), 250);
}

#[test]
fn test_concurrent_cache_creation() {
    let registry = registry();

    let workers: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || registry.create_cache("contended").is_ok())
        })
        .collect();

    let created = workers
        .into_iter()
        .map(|worker| worker.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(created, 1);
    assert_eq!(registry.list_caches().len(), 2);
}

#[test]
fn test_no_writes_land_after_cache_deletion() {
    let registry = registry();
    let handle = registry.create_cache("doomed").unwrap();
    let barrier = Arc::new(std::sync::Barrier::new(THREADS + 1));

    let writers: Vec<_> = (0..THREADS)
        .map(|t| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                let mut committed = 0;
                for i in 0.. {
                    match registry.set("doomed", &format!("t{}-k{}", t, i), "v", None) {
                        Ok(_) => committed += 1,
                        Err(_) => break,
                    }
                }
                committed
            })
        })
        .collect();

    barrier.wait();
    thread::sleep(std::time::Duration::from_millis(5));
    registry.delete_cache("doomed").unwrap();
    let len_at_delete = handle.store().len();

    let committed: usize = writers.into_iter().map(|w| w.join().unwrap()).sum();

    // Every acknowledged write went in before the delete returned
    assert_eq!(handle.store().len(), len_at_delete);
    assert_eq!(committed, len_at_delete);
}
