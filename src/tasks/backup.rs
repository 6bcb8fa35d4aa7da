//! Periodic Backup Task
//!
//! Background task that snapshots every cache to disk and prunes old backups.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::backup::BackupWriter;
use crate::cache::CacheRegistry;

/// Spawns a background task that writes a backup of every cache each
/// interval, then removes backups older than the writer's retention window.
///
/// File I/O runs on the blocking pool. Failures are logged and the task keeps
/// running.
pub fn spawn_backup_task(
    registry: Arc<CacheRegistry>,
    writer: BackupWriter,
    backup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(backup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            dir = %writer.dir().display(),
            "Starting backup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let registry = Arc::clone(&registry);
            let writer = writer.clone();
            let pass = tokio::task::spawn_blocking(move || {
                writer.backup_all(&registry)?;
                writer.cleanup_old_backups()
            });

            match pass.await {
                Ok(Ok(pruned)) if pruned > 0 => info!("Pruned {} old backups", pruned),
                Ok(Ok(_)) => {}
                Ok(Err(err)) => warn!("Automatic backup failed: {}", err),
                Err(err) => warn!("Automatic backup task panicked: {}", err),
            }
        }
    })
}
