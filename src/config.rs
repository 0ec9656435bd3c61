use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub ledger: LedgerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind the API server to
    pub host: String,
    /// API server port (default: 5001)
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite connection URL (e.g. "sqlite://bettracker.db" or "sqlite::memory:")
    pub url: String,
    /// Maximum connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
    /// Directory for daily rotating log files; console only when unset
    #[serde(default)]
    pub dir: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Defaults applied by the ledger services
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Stake used for a converted leg when the request gives none
    pub default_stake: f64,
    /// Sport recorded on bets created from arbitrage opportunities
    pub default_sport: String,
    /// Page size when the caller does not send `per_page`
    pub default_per_page: u32,
    /// Upper bound for `per_page`
    pub max_per_page: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            default_stake: 100.0,
            default_sport: "Football".to_string(),
            default_per_page: 20,
            max_per_page: 100,
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5001)?
            .set_default("database.url", "sqlite://bettracker.db")?
            .set_default("database.max_connections", 5)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("ledger.default_stake", 100.0)?
            .set_default("ledger.default_sport", "Football")?
            .set_default("ledger.default_per_page", 20)?
            .set_default("ledger.max_per_page", 100)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("BETLEDGER_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (BETLEDGER__DATABASE__URL, etc.)
            .add_source(
                Environment::with_prefix("BETLEDGER")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// In-memory configuration for tests and one-off tooling
    pub fn in_memory() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: DatabaseConfig {
                url: "sqlite::memory:".to_string(),
                max_connections: 1,
            },
            logging: LoggingConfig::default(),
            ledger: LedgerConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.database.url.trim().is_empty() {
            errors.push("database.url must not be empty".to_string());
        }

        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be at least 1".to_string());
        }

        if !self.ledger.default_stake.is_finite() || self.ledger.default_stake <= 0.0 {
            errors.push(format!(
                "ledger.default_stake must be positive, got {}",
                self.ledger.default_stake
            ));
        }

        if self.ledger.default_sport.trim().is_empty() {
            errors.push("ledger.default_sport must not be empty".to_string());
        }

        if self.ledger.max_per_page == 0 {
            errors.push("ledger.max_per_page must be at least 1".to_string());
        }

        if self.ledger.default_per_page == 0
            || self.ledger.default_per_page > self.ledger.max_per_page
        {
            errors.push(format!(
                "ledger.default_per_page must be between 1 and {}",
                self.ledger.max_per_page
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_config_is_valid() {
        let config = AppConfig::in_memory();
        assert!(config.validate().is_ok());
        assert_eq!(config.ledger.default_stake, 100.0);
        assert_eq!(config.ledger.default_sport, "Football");
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = AppConfig::in_memory();
        config.database.url = String::new();
        config.ledger.default_stake = -5.0;
        config.ledger.default_per_page = 500;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("database.url"));
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let config = AppConfig::load_from("does/not/exist").unwrap();
        assert_eq!(config.server.port, 5001);
        assert_eq!(config.ledger.default_per_page, 20);
        assert_eq!(config.logging.level, "info");
    }
}
