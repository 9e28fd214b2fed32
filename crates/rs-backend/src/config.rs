//! Configuration management for rs-backend.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default application directory name.
const APP_DIR_NAME: &str = "rs-backend";

/// Environment variable prefix; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "RS_SURVEY__";

/// Placeholder shown instead of secret values.
const REDACTED: &str = "**********";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `RS_SURVEY__`)
/// 2. TOML config file at `~/.config/rs-backend/config.toml`
/// 3. Default values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Display name of the service.
    pub app_name: String,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// HTTP server configuration.
    pub server: ServerConfig,
}

/// Which storage medium backs the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Flat CSV files in a local directory.
    #[default]
    Csv,
    /// A Google Sheets workbook.
    Sheets,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Csv => write!(f, "csv"),
            Self::Sheets => write!(f, "sheets"),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Active backend.
    pub backend: BackendKind,
    /// Directory holding `surveys.csv` and `stories.csv`.
    /// Defaults to `~/.local/share/rs-backend/data`
    pub csv_data_dir: Option<PathBuf>,
    /// Spreadsheet backend settings.
    pub sheets: SheetsConfig,
}

/// Spreadsheet backend configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// Path to the service-account JSON key file.
    pub credentials_path: Option<PathBuf>,
    /// Identifier of the target spreadsheet.
    pub spreadsheet_id: Option<String>,
    /// Transport timeout for each API request.
    pub request_timeout_secs: u64,
}

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "RS Backend".to_string(),
            storage: StorageConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            credentials_path: None,
            spreadsheet_id: None,
            request_timeout_secs: 30,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing, or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing, or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config = Self::figment(config_path).extract::<Config>()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the layered figment without extracting it.
    #[must_use]
    pub fn figment(config_path: Option<PathBuf>) -> Figment {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(APP_DIR_NAME)
            .join("data")
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationInvalid`] if a required setting for the
    /// selected backend is missing or a value is out of range.
    pub fn validate(&self) -> Result<()> {
        self.bind_addr()?;

        if self.storage.sheets.request_timeout_secs == 0 {
            return Err(Error::config_invalid(
                "storage.sheets.request_timeout_secs must be greater than 0",
            ));
        }

        if self.storage.backend == BackendKind::Sheets {
            if self.storage.sheets.credentials_path.is_none() {
                return Err(Error::config_invalid(
                    "storage.sheets.credentials_path is required for the sheets backend",
                ));
            }
            match self.storage.sheets.spreadsheet_id.as_deref() {
                None => {
                    return Err(Error::config_invalid(
                        "storage.sheets.spreadsheet_id is required for the sheets backend",
                    ))
                }
                Some(id) if id.trim().is_empty() => {
                    return Err(Error::config_invalid(
                        "storage.sheets.spreadsheet_id must not be empty",
                    ))
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Get the CSV data directory, resolving defaults if not set.
    #[must_use]
    pub fn csv_data_dir(&self) -> PathBuf {
        self.storage
            .csv_data_dir
            .clone()
            .unwrap_or_else(Self::default_data_dir)
    }

    /// Parse the configured bind address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationInvalid`] if the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind.parse().map_err(|_| {
            Error::config_invalid(format!("invalid server.bind address: {}", self.server.bind))
        })
    }

    /// Get the spreadsheet request timeout as a Duration.
    #[must_use]
    pub fn sheets_request_timeout(&self) -> Duration {
        Duration::from_secs(self.storage.sheets.request_timeout_secs)
    }

    /// A copy safe to log or print, with the credentials path masked.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.storage.sheets.credentials_path.is_some() {
            copy.storage.sheets.credentials_path = Some(PathBuf::from(REDACTED));
        }
        copy
    }
}
