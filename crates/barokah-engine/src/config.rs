//! # Engine Configuration
//!
//! Configuration for the order and promotion engine and the jobs binary.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BAROKAH_DATABASE_PATH=/var/lib/barokah/barokah.db                  │
//! │     BAROKAH_BIRTHDAY_MODE=materialized                                 │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     --config <path>, or the platform config dir:                       │
//! │     ~/.config/barokah/barokah.toml (Linux)                             │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     UTC+07:00, Rp 5.000.000 threshold, 24h payment window             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [store]
//! utc_offset_minutes = 420        # WIB
//!
//! [loyalty]
//! threshold_rupiah = 5000000
//! conditional_cart_threshold_rupiah = 5000000
//! top_products_limit = 3
//! birthday_percent = 10
//!
//! [orders]
//! payment_window_hours = 24
//! max_cart_items = 100
//!
//! [promotions]
//! birthday_discount_mode = "per_resolve"   # per_resolve | materialized
//!
//! [jobs]
//! expiry_interval_secs = 300
//! birthday_sweep_hour = 0                  # store-local hour
//!
//! [database]
//! path = "barokah.db"
//! max_connections = 5
//! ```

use chrono::{Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use barokah_core::loyalty::{
    BIRTHDAY_DISCOUNT_PERCENT, CONDITIONAL_CART_THRESHOLD, LOYALTY_THRESHOLD, TOP_PRODUCTS_LIMIT,
};
use barokah_core::{
    BirthdayDiscountMode, Money, PromotionPolicy, DEFAULT_PAYMENT_WINDOW_HOURS, MAX_CART_ITEMS,
};
use barokah_db::DbConfig;

// =============================================================================
// Sections
// =============================================================================

/// Store calendar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Fixed offset of the store's time zone from UTC, in minutes.
    #[serde(default = "default_utc_offset_minutes")]
    pub utc_offset_minutes: i32,
}

fn default_utc_offset_minutes() -> i32 {
    7 * 60
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            utc_offset_minutes: default_utc_offset_minutes(),
        }
    }
}

/// Loyalty and birthday promotion parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltySettings {
    #[serde(default = "default_threshold_rupiah")]
    pub threshold_rupiah: i64,

    #[serde(default = "default_conditional_threshold_rupiah")]
    pub conditional_cart_threshold_rupiah: i64,

    #[serde(default = "default_top_products_limit")]
    pub top_products_limit: usize,

    #[serde(default = "default_birthday_percent")]
    pub birthday_percent: u32,
}

fn default_threshold_rupiah() -> i64 {
    LOYALTY_THRESHOLD.major_units()
}

fn default_conditional_threshold_rupiah() -> i64 {
    CONDITIONAL_CART_THRESHOLD.major_units()
}

fn default_top_products_limit() -> usize {
    TOP_PRODUCTS_LIMIT
}

fn default_birthday_percent() -> u32 {
    BIRTHDAY_DISCOUNT_PERCENT
}

impl Default for LoyaltySettings {
    fn default() -> Self {
        LoyaltySettings {
            threshold_rupiah: default_threshold_rupiah(),
            conditional_cart_threshold_rupiah: default_conditional_threshold_rupiah(),
            top_products_limit: default_top_products_limit(),
            birthday_percent: default_birthday_percent(),
        }
    }
}

/// Order submission limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSettings {
    #[serde(default = "default_payment_window_hours")]
    pub payment_window_hours: i64,

    #[serde(default = "default_max_cart_items")]
    pub max_cart_items: usize,
}

fn default_payment_window_hours() -> i64 {
    DEFAULT_PAYMENT_WINDOW_HOURS
}

fn default_max_cart_items() -> usize {
    MAX_CART_ITEMS
}

impl Default for OrderSettings {
    fn default() -> Self {
        OrderSettings {
            payment_window_hours: default_payment_window_hours(),
            max_cart_items: default_max_cart_items(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromotionSettings {
    #[serde(default)]
    pub birthday_discount_mode: BirthdayDiscountMode,
}

/// Scheduling of the jobs binary's `run` loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSettings {
    #[serde(default = "default_expiry_interval_secs")]
    pub expiry_interval_secs: u64,

    /// Store-local hour (0-23) at or after which the daily birthday sweep runs.
    #[serde(default)]
    pub birthday_sweep_hour: u32,
}

fn default_expiry_interval_secs() -> u64 {
    300
}

impl Default for JobSettings {
    fn default() -> Self {
        JobSettings {
            expiry_interval_secs: default_expiry_interval_secs(),
            birthday_sweep_hour: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("barokah.db")
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
// Engine Config
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store: StoreSettings,

    #[serde(default)]
    pub loyalty: LoyaltySettings,

    #[serde(default)]
    pub orders: OrderSettings,

    #[serde(default)]
    pub promotions: PromotionSettings,

    #[serde(default)]
    pub jobs: JobSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (barokah.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoConfigPath)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        // FixedOffset accepts strictly less than a day either way
        if self.store.utc_offset_minutes.abs() >= 24 * 60 {
            return Err(ConfigError::Invalid(format!(
                "store.utc_offset_minutes must be within ±1439, got {}",
                self.store.utc_offset_minutes
            )));
        }

        if self.loyalty.threshold_rupiah < 0 || self.loyalty.conditional_cart_threshold_rupiah < 0 {
            return Err(ConfigError::Invalid("loyalty thresholds must not be negative".into()));
        }

        if self.loyalty.birthday_percent > 100 {
            return Err(ConfigError::Invalid(format!(
                "loyalty.birthday_percent must be 0-100, got {}",
                self.loyalty.birthday_percent
            )));
        }

        if self.orders.payment_window_hours <= 0 {
            return Err(ConfigError::Invalid("orders.payment_window_hours must be positive".into()));
        }

        if self.orders.max_cart_items == 0 || self.orders.max_cart_items > MAX_CART_ITEMS {
            return Err(ConfigError::Invalid(format!(
                "orders.max_cart_items must be 1-{}",
                MAX_CART_ITEMS
            )));
        }

        if self.jobs.expiry_interval_secs == 0 {
            return Err(ConfigError::Invalid("jobs.expiry_interval_secs must be greater than 0".into()));
        }

        if self.jobs.birthday_sweep_hour > 23 {
            return Err(ConfigError::Invalid("jobs.birthday_sweep_hour must be 0-23".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid("database.max_connections must be greater than 0".into()));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("BAROKAH_DATABASE_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(offset) = std::env::var("BAROKAH_UTC_OFFSET_MINUTES") {
            match offset.parse::<i32>() {
                Ok(minutes) => self.store.utc_offset_minutes = minutes,
                Err(_) => warn!(value = %offset, "Ignoring invalid BAROKAH_UTC_OFFSET_MINUTES"),
            }
        }

        if let Ok(threshold) = std::env::var("BAROKAH_LOYALTY_THRESHOLD") {
            match threshold.parse::<i64>() {
                Ok(rupiah) => self.loyalty.threshold_rupiah = rupiah,
                Err(_) => warn!(value = %threshold, "Ignoring invalid BAROKAH_LOYALTY_THRESHOLD"),
            }
        }

        if let Ok(hours) = std::env::var("BAROKAH_PAYMENT_WINDOW_HOURS") {
            if let Ok(h) = hours.parse::<i64>() {
                self.orders.payment_window_hours = h;
            }
        }

        if let Ok(mode) = std::env::var("BAROKAH_BIRTHDAY_MODE") {
            match mode.to_lowercase().as_str() {
                "per_resolve" => self.promotions.birthday_discount_mode = BirthdayDiscountMode::PerResolve,
                "materialized" => {
                    self.promotions.birthday_discount_mode = BirthdayDiscountMode::Materialized
                }
                _ => warn!(mode = %mode, "Unknown birthday discount mode in environment"),
            }
        }

        if let Ok(secs) = std::env::var("BAROKAH_EXPIRY_INTERVAL_SECS") {
            if let Ok(s) = secs.parse::<u64>() {
                self.jobs.expiry_interval_secs = s;
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("id", "barokah", "barokah")
            .map(|dirs| dirs.config_dir().join("barokah.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The store's time zone. An out-of-range offset (rejected by
    /// `validate`) degrades to UTC.
    pub fn store_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.store.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    pub fn loyalty_threshold(&self) -> Money {
        Money::from_major(self.loyalty.threshold_rupiah)
    }

    pub fn payment_window(&self) -> Duration {
        Duration::hours(self.orders.payment_window_hours)
    }

    pub fn promotion_policy(&self) -> PromotionPolicy {
        PromotionPolicy {
            birthday_percent: self.loyalty.birthday_percent,
            conditional_cart_threshold: Money::from_major(self.loyalty.conditional_cart_threshold_rupiah),
            birthday_mode: self.promotions.birthday_discount_mode,
        }
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path).max_connections(self.database.max_connections)
    }
}
