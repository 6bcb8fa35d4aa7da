//! Backup Module
//!
//! Writes timestamped JSON snapshots of every cache, restores them, and prunes
//! old files. TTL metadata is not saved: restored entries come back without
//! their original expiration.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cache::{CacheRegistry, CacheSnapshot};
use crate::config::Config;
use crate::error::CacheError;

const NAMED_CACHE_TYPE: &str = "named_cache";
const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
/// Length of `YYYYmmdd_HHMMSS.json`
const FILE_SUFFIX_LEN: usize = 20;

// == Backup Error ==
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed backup {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported backup type '{0}'")]
    UnsupportedType(String),

    #[error(transparent)]
    Registry(#[from] CacheError),
}

pub type Result<T> = std::result::Result<T, BackupError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> BackupError + '_ {
    move |source| BackupError::Io {
        path: path.to_path_buf(),
        source,
    }
}

// == Backup File ==
/// On-disk layout of a cache backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BackupFile {
    #[serde(rename = "type")]
    kind: String,
    cache_name: String,
    timestamp: String,
    datetime: String,
    item_count: usize,
    data: BTreeMap<String, String>,
}

/// Listing row for a backup file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupInfo {
    pub path: PathBuf,
    pub file_name: String,
    pub size: u64,
    pub modified: SystemTime,
}

// == Backup Writer ==
/// Saves and restores cache snapshots as `cache_{name}_{timestamp}.json`.
#[derive(Debug, Clone)]
pub struct BackupWriter {
    dir: PathBuf,
    retention_days: u64,
}

impl BackupWriter {
    pub fn new(dir: impl Into<PathBuf>, retention_days: u64) -> Self {
        Self {
            dir: dir.into(),
            retention_days,
        }
    }

    /// Returns a writer if the configuration enables backups.
    pub fn from_config(config: &Config) -> Option<Self> {
        config
            .backup_dir
            .as_ref()
            .map(|dir| Self::new(dir.clone(), config.backup_retention_days))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // == Backup ==
    /// Writes one file per live cache. Returns the paths written.
    ///
    /// Each cache is backed up independently: a cache that fails to write is
    /// logged and skipped. Only a backup directory that cannot be created
    /// fails the whole pass.
    pub fn backup_all(&self, registry: &CacheRegistry) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.dir).map_err(io_error(&self.dir))?;

        let now = Local::now();
        let mut written = Vec::new();
        for snapshot in registry.snapshot() {
            match self.write_snapshot(&snapshot, now) {
                Ok(path) => written.push(path),
                Err(err) => warn!(cache = %snapshot.cache_name, "Backup failed: {}", err),
            }
        }

        info!(
            dir = %self.dir.display(),
            "Backup completed: {} caches written",
            written.len()
        );
        Ok(written)
    }

    /// Writes a single snapshot stamped with `at`.
    pub fn write_snapshot(&self, snapshot: &CacheSnapshot, at: DateTime<Local>) -> Result<PathBuf> {
        let timestamp = at.format(FILE_TIMESTAMP_FORMAT).to_string();
        let path = self
            .dir
            .join(format!("cache_{}_{}.json", snapshot.cache_name, timestamp));

        let file = BackupFile {
            kind: NAMED_CACHE_TYPE.to_string(),
            cache_name: snapshot.cache_name.clone(),
            timestamp,
            datetime: at.to_rfc3339(),
            item_count: snapshot.data.len(),
            data: snapshot.data.clone(),
        };

        let json = serde_json::to_string_pretty(&file).map_err(|source| BackupError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, json).map_err(io_error(&path))?;

        debug!(cache = %snapshot.cache_name, path = %path.display(), "Cache backed up");
        Ok(path)
    }

    // == Restore ==
    /// Restores the cache stored in `path`. Returns its name.
    pub fn restore_file(&self, registry: &CacheRegistry, path: &Path) -> Result<String> {
        restore_backup(registry, read_backup(path)?)
    }

    /// Restores the newest readable backup of every cache found in the
    /// directory.
    ///
    /// Files that cannot be read or restored are skipped with a warning, and
    /// an older backup of the same cache is tried instead. Returns the
    /// restored names.
    pub fn restore_latest(&self, registry: &CacheRegistry) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut restored = Vec::new();

        for backup in self.list_backups(None)? {
            let file = match read_backup(&backup.path) {
                Ok(file) => file,
                Err(err) => {
                    warn!("Skipping backup {}: {}", backup.file_name, err);
                    continue;
                }
            };
            if seen.contains(&file.cache_name) {
                continue;
            }
            match restore_backup(registry, file) {
                Ok(name) => {
                    seen.insert(name.clone());
                    restored.push(name);
                }
                Err(err) => warn!("Skipping backup {}: {}", backup.file_name, err),
            }
        }

        Ok(restored)
    }

    // == Listing ==
    /// Lists backup files, newest first, optionally only those of one cache.
    pub fn list_backups(&self, cache_name: Option<&str>) -> Result<Vec<BackupInfo>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let prefix = cache_name.map(|name| format!("cache_{}_", name));
        let mut backups = Vec::new();

        for entry in fs::read_dir(&self.dir).map_err(io_error(&self.dir))? {
            let entry = entry.map_err(io_error(&self.dir))?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.starts_with("cache_") || !file_name.ends_with(".json") {
                continue;
            }
            if let Some(prefix) = &prefix {
                let matches = file_name
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.len() == FILE_SUFFIX_LEN);
                if !matches {
                    continue;
                }
            }

            let path = entry.path();
            let metadata = entry.metadata().map_err(io_error(&path))?;
            backups.push(BackupInfo {
                size: metadata.len(),
                modified: metadata.modified().map_err(io_error(&path))?,
                path,
                file_name,
            });
        }

        // Names embed the timestamp, so a reverse sort puts the newest first
        backups.sort_by(|a, b| b.file_name.cmp(&a.file_name));
        Ok(backups)
    }

    // == Retention ==
    /// Deletes backups last modified before the retention window.
    ///
    /// Returns the number of files removed.
    pub fn cleanup_old_backups(&self) -> Result<usize> {
        let window = Duration::from_secs(self.retention_days.saturating_mul(86_400));
        let cutoff = SystemTime::now()
            .checked_sub(window)
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let mut removed = 0;
        for backup in self.list_backups(None)? {
            if backup.modified <= cutoff {
                fs::remove_file(&backup.path).map_err(io_error(&backup.path))?;
                info!("Deleted old backup: {}", backup.file_name);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn restore_backup(registry: &CacheRegistry, file: BackupFile) -> Result<String> {
    if file.kind != NAMED_CACHE_TYPE {
        return Err(BackupError::UnsupportedType(file.kind));
    }

    registry.restore(&CacheSnapshot {
        cache_name: file.cache_name.clone(),
        data: file.data,
    })?;
    Ok(file.cache_name)
}

fn read_backup(path: &Path) -> Result<BackupFile> {
    let raw = fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&raw).map_err(|source| BackupError::Json {
        path: path.to_path_buf(),
        source,
    })
}
