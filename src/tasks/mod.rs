//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiration sweep: Removes expired entries from every store
//! - Backup: Writes JSON snapshots of every cache and prunes old ones

mod backup;
mod sweep;

pub use backup::spawn_backup_task;
pub use sweep::spawn_sweep_task;
