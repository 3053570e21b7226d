//! # Ledger Configuration
//!
//! Loaded in layers, later sources winning:
//!
//! ```text
//!   built-in defaults  →  tally.toml (optional)  →  TALLY__* environment
//!
//!   TALLY__DATABASE_PATH=/var/lib/tally/tally.db
//!   TALLY__STOCK_POLICY=allow_backorder
//!   TALLY__LOCK_TIMEOUT_SECS=2
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tally_core::validation::validate_tax_rate_bps;
use tally_db::DbConfig;

use crate::stock::StockPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "tally.toml";
pub const ENV_PREFIX: &str = "TALLY";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    /// How long an operation waits for the SQLite write lock.
    pub lock_timeout_secs: u64,
    pub stock_policy: StockPolicy,
    /// Used when a tenant has no tax settings row.
    pub default_tax_rate_bps: u32,
    /// Due date of a credit sale, in days after the sale date.
    pub credit_terms_days: i64,
    /// Capacity of the post-commit event queue.
    pub event_buffer: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            database_path: PathBuf::from("./tally.db"),
            max_connections: 5,
            lock_timeout_secs: 5,
            stock_policy: StockPolicy::RejectOversell,
            default_tax_rate_bps: 0,
            credit_terms_days: 30,
            event_buffer: 256,
        }
    }
}

impl LedgerConfig {
    /// Loads `tally.toml` from the working directory (if present) and the
    /// environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        let config: LedgerConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Message("max_connections must be at least 1".into()));
        }
        validate_tax_rate_bps(self.default_tax_rate_bps)
            .map_err(|e| ConfigError::Message(format!("default_tax_rate_bps: {e}")))?;
        if self.credit_terms_days < 0 {
            return Err(ConfigError::Message("credit_terms_days must not be negative".into()));
        }
        if self.event_buffer == 0 {
            return Err(ConfigError::Message("event_buffer must be at least 1".into()));
        }
        Ok(())
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_secs(self.lock_timeout_secs)
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.max_connections)
            .lock_timeout(self.lock_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use uuid::Uuid;

    #[test]
    fn test_defaults() {
        let config = LedgerConfig::default();
        assert_eq!(config.stock_policy, StockPolicy::RejectOversell);
        assert_eq!(config.credit_terms_days, 30);
        assert_eq!(config.lock_timeout(), Duration::from_secs(5));
        assert_eq!(config.db_config().max_connections, 5);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("tally-config-{}.toml", Uuid::new_v4()));
        fs::write(
            &path,
            "stock_policy = \"allow_backorder\"\ndefault_tax_rate_bps = 1000\ncredit_terms_days = 14\n",
        )
        .unwrap();

        let config = LedgerConfig::load_from(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.stock_policy, StockPolicy::AllowBackorder);
        assert_eq!(config.default_tax_rate_bps, 1000);
        assert_eq!(config.credit_terms_days, 14);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn test_rejects_bad_tax_rate() {
        let path = std::env::temp_dir().join(format!("tally-config-{}.toml", Uuid::new_v4()));
        fs::write(&path, "default_tax_rate_bps = 20000\n").unwrap();

        let result = LedgerConfig::load_from(&path);
        fs::remove_file(&path).ok();

        assert!(result.is_err());
    }
}
