//! Configuration management for EventGate
//!
//! Configuration comes from defaults, a TOML file, or `EVENTGATE_<SECTION>_<KEY>`
//! environment variables, and is validated before use.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

use crate::logging::{LogConfig, LogLevel};

/// Path value that selects a private in-memory database
pub const IN_MEMORY_DATABASE: &str = ":memory:";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store configuration
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Join rules that apply to every event
    pub admission: AdmissionConfig,

    /// Redaction settings
    pub privacy: PrivacyConfig,
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file (":memory:" for a throwaway database)
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub pool_size: u32,

    /// How long a writer waits for the database lock before failing
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,

    /// Enable WAL journal mode on file databases
    pub enable_wal: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Platform-wide admission rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Unverified non-admin users may not join any event, whatever the
    /// event's own `require_verified_to_join` flag says
    pub require_verified_for_all_joins: bool,
}

/// Redaction settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacyConfig {
    /// Shown in place of a hidden organizer's name
    pub organizer_placeholder: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./eventgate.db"),
            pool_size: 8,
            busy_timeout: Duration::from_secs(5),
            enable_wal: true,
        }
    }
}

impl StoreConfig {
    /// Store settings for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            database_path: PathBuf::from(IN_MEMORY_DATABASE),
            pool_size: 1,
            ..Self::default()
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == IN_MEMORY_DATABASE
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl LoggingConfig {
    /// Subscriber settings for [`init_logging_with_config`](crate::logging::init_logging_with_config)
    pub fn to_log_config(&self) -> Result<LogConfig, ConfigError> {
        let level = LogLevel::from_str(&self.level).map_err(|e| ConfigError::InvalidValue {
            key: "logging.level".to_string(),
            reason: e.to_string(),
        })?;

        Ok(LogConfig::new(level)
            .with_json(self.json_format)
            .with_timestamp(self.with_timestamp)
            .with_target(self.with_target))
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            require_verified_for_all_joins: true,
        }
    }
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            organizer_placeholder: "Join to see organizer".to_string(),
        }
    }
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: EVENTGATE_<SECTION>_<KEY>
    /// Example: EVENTGATE_STORE_BUSY_TIMEOUT=10s
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Apply overrides from `lookup` on top of the defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        // Store
        if let Some(path) = lookup("EVENTGATE_STORE_DATABASE_PATH") {
            self.store.database_path = PathBuf::from(path);
        }
        if let Some(raw) = lookup("EVENTGATE_STORE_POOL_SIZE") {
            self.store.pool_size = parse_var("EVENTGATE_STORE_POOL_SIZE", &raw)?;
        }
        if let Some(raw) = lookup("EVENTGATE_STORE_BUSY_TIMEOUT") {
            self.store.busy_timeout = humantime_serde::re::humantime::parse_duration(&raw)
                .map_err(|e| ConfigError::InvalidValue {
                    key: "EVENTGATE_STORE_BUSY_TIMEOUT".to_string(),
                    reason: e.to_string(),
                })?;
        }
        if let Some(raw) = lookup("EVENTGATE_STORE_ENABLE_WAL") {
            self.store.enable_wal = parse_var("EVENTGATE_STORE_ENABLE_WAL", &raw)?;
        }

        // Logging
        if let Some(level) = lookup("EVENTGATE_LOGGING_LEVEL") {
            self.logging.level = level.to_lowercase();
        }
        if let Some(raw) = lookup("EVENTGATE_LOGGING_JSON_FORMAT") {
            self.logging.json_format = parse_var("EVENTGATE_LOGGING_JSON_FORMAT", &raw)?;
        }

        // Admission
        if let Some(raw) = lookup("EVENTGATE_ADMISSION_REQUIRE_VERIFIED_FOR_ALL_JOINS") {
            self.admission.require_verified_for_all_joins =
                parse_var("EVENTGATE_ADMISSION_REQUIRE_VERIFIED_FOR_ALL_JOINS", &raw)?;
        }

        // Privacy
        if let Some(placeholder) = lookup("EVENTGATE_PRIVACY_ORGANIZER_PLACEHOLDER") {
            self.privacy.organizer_placeholder = placeholder;
        }

        Ok(())
    }

    /// Load configuration from file, then apply environment overrides
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.database_path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "store.database_path must not be empty".to_string(),
            ));
        }

        if self.store.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "store.pool_size must be greater than 0".to_string(),
            ));
        }

        if self.store.is_in_memory() && self.store.pool_size != 1 {
            return Err(ConfigError::ValidationFailed(
                "an in-memory store needs store.pool_size = 1".to_string(),
            ));
        }

        if self.store.busy_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "store.busy_timeout must be greater than 0".to_string(),
            ));
        }

        if LogLevel::from_str(&self.logging.level).is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        if self.privacy.organizer_placeholder.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "privacy.organizer_placeholder must not be blank".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Ok(())
    }
}
