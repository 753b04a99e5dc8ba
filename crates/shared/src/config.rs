//! Application configuration management.
//!
//! Configuration is loaded once at startup and passed explicitly to the
//! components that need it.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Exchange rate service configuration.
    pub rates: RatesConfig,
    /// Ledger policy configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Exchange rate service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    /// Base URL of the exchange rate API.
    #[serde(default = "default_rates_base_url")]
    pub base_url: String,
    /// API key sent in the `apikey` header.
    pub api_key: String,
    /// Upper bound for a single rate lookup, in seconds.
    #[serde(default = "default_rates_timeout")]
    pub timeout_secs: u64,
    /// How long the supported currency listing may be served from cache.
    #[serde(default = "default_symbols_ttl")]
    pub symbols_ttl_secs: u64,
}

fn default_rates_base_url() -> String {
    "https://api.apilayer.com/exchangerates_data".to_string()
}

fn default_rates_timeout() -> u64 {
    10
}

fn default_symbols_ttl() -> u64 {
    3600 // 1 hour
}

impl RatesConfig {
    /// Rate lookup timeout as a `Duration`.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Symbols cache TTL as a `Duration`.
    #[must_use]
    pub const fn symbols_ttl(&self) -> Duration {
        Duration::from_secs(self.symbols_ttl_secs)
    }
}

/// Ledger policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Currency of the account opened for every newly registered user.
    #[serde(default = "default_opening_currency")]
    pub opening_currency: String,
    /// Currencies that may be deposited or withdrawn directly.
    #[serde(default = "default_deposit_currencies")]
    pub deposit_currencies: Vec<String>,
}

fn default_opening_currency() -> String {
    "RUB".to_string()
}

fn default_deposit_currencies() -> Vec<String> {
    vec!["RUB".to_string()]
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            opening_currency: default_opening_currency(),
            deposit_currencies: default_deposit_currencies(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default`, `config/{RUN_MODE}`,
    /// then `FXLEDGER__SECTION__KEY` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("FXLEDGER")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("ledger.deposit_currencies")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
