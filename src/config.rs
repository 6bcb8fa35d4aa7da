//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;

/// Server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default TTL in seconds for root-store entries without explicit TTL (0 = never expire)
    pub default_ttl_secs: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Expiration sweep interval in seconds
    pub sweep_interval: u64,
    /// Directory for JSON backups, None disables backups
    pub backup_dir: Option<PathBuf>,
    /// Periodic backup interval in seconds
    pub backup_interval: u64,
    /// Backups older than this many days are removed
    pub backup_retention_days: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DEFAULT_TTL` - Default TTL in seconds (default: 0, no expiry)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `BACKUP_DIR` - Backup directory (default: unset, backups disabled)
    /// - `BACKUP_INTERVAL` - Backup frequency in seconds (default: 300)
    /// - `BACKUP_RETENTION_DAYS` - Backup retention in days (default: 30)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_ttl_secs: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl_secs),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            sweep_interval: parse_var("SWEEP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.sweep_interval),
            backup_dir: env::var("BACKUP_DIR")
                .ok()
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            backup_interval: parse_var("BACKUP_INTERVAL")
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.backup_interval),
            backup_retention_days: parse_var("BACKUP_RETENTION_DAYS")
                .unwrap_or(defaults.backup_retention_days),
        }
    }

    /// Default TTL as applied by stores: zero means entries never expire.
    pub fn default_ttl(&self) -> Option<u64> {
        (self.default_ttl_secs > 0).then_some(self.default_ttl_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ttl_secs: 0,
            server_port: 3000,
            sweep_interval: 1,
            backup_dir: None,
            backup_interval: 300,
            backup_retention_days: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.default_ttl_secs, 0);
        assert_eq!(config.default_ttl(), None);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.sweep_interval, 1);
        assert!(config.backup_dir.is_none());
        assert_eq!(config.backup_interval, 300);
        assert_eq!(config.backup_retention_days, 30);
    }

    #[test]
    fn test_default_ttl_mapping() {
        let config = Config {
            default_ttl_secs: 45,
            ..Config::default()
        };
        assert_eq!(config.default_ttl(), Some(45));
    }

    #[test]
    fn test_config_from_env_defaults() {
        // Clear any existing env vars to test defaults
        for var in [
            "DEFAULT_TTL",
            "SERVER_PORT",
            "SWEEP_INTERVAL",
            "BACKUP_DIR",
            "BACKUP_INTERVAL",
            "BACKUP_RETENTION_DAYS",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env();
        assert_eq!(config.default_ttl(), None);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.sweep_interval, 1);
        assert!(config.backup_dir.is_none());
    }
}
