//! # Till Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TILL_BIND_ADDR=0.0.0.0:8080                                        │
//! │     TILL_DB_PATH=/var/lib/till/till.db                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/till/till.toml (Linux)                                   │
//! │     ~/Library/Application Support/com.till.till/till.toml (macOS)      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! bind_addr = "127.0.0.1:8080"
//!
//! [database]
//! path = "/var/lib/till/till.db"
//! max_connections = 5
//!
//! [settlement]
//! price_drift_tolerance_minor = 0   # any change in the payable forces re-preview
//! max_cart_items = 100
//! preview_ttl_secs = 600
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{SettleError, SettleResult};

// =============================================================================
// Server Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the HTTP server listens on.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            bind_addr: default_bind_addr(),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "till", "till")
        .map(|dirs| dirs.data_dir().join("till.db"))
        .unwrap_or_else(|| PathBuf::from("till.db"))
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

// =============================================================================
// Settlement Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSettings {
    /// How far the payable amount may move between preview and commit,
    /// in minor units. 0 rejects any change.
    #[serde(default)]
    pub price_drift_tolerance_minor: i64,

    /// Most lines a single cart may carry.
    #[serde(default = "default_max_cart_items")]
    pub max_cart_items: usize,

    /// How long an uncommitted preview stays claimable.
    #[serde(default = "default_preview_ttl_secs")]
    pub preview_ttl_secs: u64,
}

fn default_max_cart_items() -> usize {
    till_core::MAX_CART_ITEMS
}

fn default_preview_ttl_secs() -> u64 {
    600
}

impl Default for SettlementSettings {
    fn default() -> Self {
        SettlementSettings {
            price_drift_tolerance_minor: 0,
            max_cart_items: default_max_cart_items(),
            preview_ttl_secs: default_preview_ttl_secs(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete till configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettleConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub settlement: SettlementSettings,
}

impl SettleConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (till.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SettleResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SettleResult<()> {
        if self.server.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(SettleError::InvalidConfig(format!(
                "bind_addr must be host:port, got: {}",
                self.server.bind_addr
            )));
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(SettleError::InvalidConfig("database path is empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(SettleError::InvalidConfig(
                "max_connections must be greater than 0".into(),
            ));
        }

        if self.settlement.price_drift_tolerance_minor < 0 {
            return Err(SettleError::InvalidConfig(
                "price_drift_tolerance_minor cannot be negative".into(),
            ));
        }

        if self.settlement.max_cart_items == 0 {
            return Err(SettleError::InvalidConfig(
                "max_cart_items must be greater than 0".into(),
            ));
        }

        if self.settlement.preview_ttl_secs == 0 {
            return Err(SettleError::InvalidConfig(
                "preview_ttl_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `TILL_*` overrides from `lookup` (the process environment in
    /// [`SettleConfig::load`]).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup("TILL_BIND_ADDR") {
            debug!(addr = %addr, "Overriding bind address from environment");
            self.server.bind_addr = addr;
        }

        if let Some(path) = lookup("TILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(raw) = lookup("TILL_DB_MAX_CONNECTIONS") {
            match raw.parse() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid TILL_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(raw) = lookup("TILL_PRICE_DRIFT_TOLERANCE") {
            match raw.parse() {
                Ok(n) => self.settlement.price_drift_tolerance_minor = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid TILL_PRICE_DRIFT_TOLERANCE"),
            }
        }

        if let Some(raw) = lookup("TILL_MAX_CART_ITEMS") {
            match raw.parse() {
                Ok(n) => self.settlement.max_cart_items = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid TILL_MAX_CART_ITEMS"),
            }
        }

        if let Some(raw) = lookup("TILL_PREVIEW_TTL_SECS") {
            match raw.parse() {
                Ok(n) => self.settlement.preview_ttl_secs = n,
                Err(_) => warn!(value = %raw, "Ignoring invalid TILL_PREVIEW_TTL_SECS"),
            }
        }
    }

    /// Pool settings for [`till_db::Database::new`].
    pub fn db_config(&self) -> till_db::DbConfig {
        till_db::DbConfig::new(self.database.path.clone()).max_connections(self.database.max_connections)
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "till")
            .map(|dirs| dirs.config_dir().join("till.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = SettleConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.settlement.price_drift_tolerance_minor, 0);
        assert_eq!(config.settlement.max_cart_items, 100);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: SettleConfig = toml::from_str(
            r#"
            [settlement]
            price_drift_tolerance_minor = 100
            "#,
        )
        .unwrap();

        assert_eq!(config.settlement.price_drift_tolerance_minor, 100);
        assert_eq!(config.settlement.preview_ttl_secs, 600);
        assert_eq!(config.server.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TILL_BIND_ADDR", "0.0.0.0:9000"),
            ("TILL_DB_PATH", "/tmp/till-test.db"),
            ("TILL_MAX_CART_ITEMS", "not-a-number"),
            ("TILL_PRICE_DRIFT_TOLERANCE", "50"),
        ]);

        let mut config = SettleConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.bind_addr, "0.0.0.0:9000");
        assert_eq!(config.database.path, PathBuf::from("/tmp/till-test.db"));
        assert_eq!(config.settlement.max_cart_items, 100);
        assert_eq!(config.settlement.price_drift_tolerance_minor, 50);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SettleConfig::default();
        config.server.bind_addr = "nowhere".into();
        assert!(matches!(config.validate(), Err(SettleError::InvalidConfig(_))));

        let mut config = SettleConfig::default();
        config.settlement.price_drift_tolerance_minor = -1;
        assert!(config.validate().is_err());

        let mut config = SettleConfig::default();
        config.settlement.max_cart_items = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_db_config_follows_settings() {
        let mut config = SettleConfig::default();
        config.database.path = PathBuf::from("/tmp/till.db");
        config.database.max_connections = 3;

        let db = config.db_config();
        assert_eq!(db.database_path, PathBuf::from("/tmp/till.db"));
        assert_eq!(db.max_connections, 3);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("till-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[server]\nbind_addr = \"127.0.0.1:9999\"\n").unwrap();

        let config = SettleConfig::load(Some(path.clone())).unwrap();
        std::fs::remove_file(&path).unwrap();

        // TILL_BIND_ADDR is not set in the test environment
        if std::env::var("TILL_BIND_ADDR").is_err() {
            assert_eq!(config.server.bind_addr, "127.0.0.1:9999");
        }
    }
}
