//! Radish - an in-memory key-value store with named caches
//!
//! Per-key TTL expiration, nested expiring stores addressed as
//! `cache:store:key`, and a synchronous mutation event bus.

pub mod api;
pub mod backup;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::CacheRegistry;
pub use config::Config;
pub use events::EventBus;
pub use tasks::{spawn_backup_task, spawn_sweep_task};
