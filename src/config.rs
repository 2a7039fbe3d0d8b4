//! Configuration management for the library tracker

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LibraryConfig {
    pub name: String,
    /// text, csv or json
    pub report_format: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub transaction_log: PathBuf,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: String,
    /// pretty or json
    pub format: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    pub library: LibraryConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from defaults, `config/library.*` and environment variables
    ///
    /// Environment variables use the `LIBRARY_TRACKER__` prefix with `__` between
    /// sections, e.g. `LIBRARY_TRACKER__STORAGE__DATA_DIR=/var/lib/library`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::with_defaults(Config::builder())?
            .add_source(File::with_name("config/library").required(false))
            .add_source(
                Environment::with_prefix("LIBRARY_TRACKER")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }

    /// Register the built-in defaults; later sources override them
    pub fn with_defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let defaults = Self::default();
        builder
            .set_default("library.name", defaults.library.name)?
            .set_default("library.report_format", defaults.library.report_format)?
            .set_default(
                "storage.data_dir",
                defaults.storage.data_dir.to_string_lossy().into_owned(),
            )?
            .set_default(
                "storage.transaction_log",
                defaults.storage.transaction_log.to_string_lossy().into_owned(),
            )?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            name: "Python Learning Library".to_string(),
            report_format: "text".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            transaction_log: PathBuf::from("data/library_log.txt"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library: LibraryConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
