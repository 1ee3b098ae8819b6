//! Configuration for estimo
//!
//! Loaded from TOML. Every section has defaults, so an empty file (or no file
//! at all) yields a working configuration:
//!
//! ```toml
//! [paths]
//! income_table = "model/code_income_data.csv"
//! model = "model/model.json"
//!
//! [income]
//! year = 2022
//! excluded_postal_codes = ["9", "612"]
//! geo_delimiter = ","
//! income_delimiter = ","
//!
//! [features]
//! subtype_policy = "strict"
//!
//! [server]
//! addr = "127.0.0.1:8080"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::income::IncomeBuildOptions;
use crate::subtype::SubtypePolicy;

/// File name looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "estimo.toml";

/// Errors that can occur when loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("TOML parse error: {0}")]
    Parse(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimoConfig {
    pub paths: PathsConfig,
    pub income: IncomeConfig,
    pub features: FeaturesConfig,
    pub server: ServerConfig,
}

/// Artifact locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Derived postal code → income table
    pub income_table: PathBuf,
    /// Serialized tree ensemble
    pub model: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            income_table: PathBuf::from("model/code_income_data.csv"),
            model: PathBuf::from("model/model.json"),
        }
    }
}

/// Income table build settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeConfig {
    pub year: i32,
    pub excluded_postal_codes: Vec<String>,
    pub geo_delimiter: char,
    pub income_delimiter: char,
}

impl Default for IncomeConfig {
    fn default() -> Self {
        Self {
            year: 2022,
            excluded_postal_codes: vec!["9".to_string(), "612".to_string()],
            geo_delimiter: ',',
            income_delimiter: ',',
        }
    }
}

impl IncomeConfig {
    pub fn build_options(&self) -> IncomeBuildOptions {
        IncomeBuildOptions {
            year: self.year,
            excluded_postal_codes: self.excluded_postal_codes.clone(),
            geo_delimiter: self.geo_delimiter as u8,
            income_delimiter: self.income_delimiter as u8,
        }
    }
}

/// Feature assembly settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    pub subtype_policy: SubtypePolicy,
}

/// HTTP server settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl EstimoConfig {
    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load configuration from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml(&content)?;
        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Resolve configuration from the standard locations.
    ///
    /// An explicit path must exist. Otherwise `estimo.toml` in the working
    /// directory, then `<config dir>/estimo/config.toml`, then defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        for candidate in Self::standard_locations() {
            if candidate.is_file() {
                return Self::load(candidate);
            }
        }
        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    fn standard_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            locations.push(dir.join("estimo").join("config.toml"));
        }
        locations
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, delimiter) in [
            ("geo_delimiter", self.income.geo_delimiter),
            ("income_delimiter", self.income.income_delimiter),
        ] {
            if !delimiter.is_ascii() || delimiter.is_ascii_alphanumeric() {
                return Err(ConfigError::OutOfRange(format!(
                    "income.{} must be an ASCII punctuation or whitespace character, got {:?}",
                    name, delimiter
                )));
            }
        }

        if self.income.year < 1900 {
            return Err(ConfigError::OutOfRange(format!(
                "income.year must be a fiscal year, got {}",
                self.income.year
            )));
        }

        if self.server.addr.trim().is_empty() {
            return Err(ConfigError::OutOfRange("server.addr must not be empty".to_string()));
        }

        Ok(())
    }
}
