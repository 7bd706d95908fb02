use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::{Path, PathBuf};

use crate::database::DatabaseConnection;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Catalog file location; the platform data directory is used
    /// when unset
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Directory holding the raw BANCA data distribution
    #[serde(default = "default_data_directory")]
    pub data_directory: PathBuf,

    /// Filename extension of the raw files, including the leading dot
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Log level for the application
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Errors only
    Error,
    /// Errors and warnings
    Warn,
    /// Normal operation logging
    #[default]
    Info,
    /// Detailed debugging
    Debug,
    /// Everything
    Trace,
}

fn default_data_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_extension() -> String {
    ".jpg".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            data_directory: default_data_directory(),
            extension: default_extension(),
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load the configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())
            .map_err(|e| anyhow!("Failed to open config file {:?}: {}", path.as_ref(), e))?;
        let reader = std::io::BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path.as_ref(), e))?;
        Ok(config)
    }

    /// Write the configuration to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path.as_ref(), e))?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.extension.is_empty() && !self.extension.starts_with('.') {
            return Err(anyhow!(
                "Extension must start with a dot (e.g. \".jpg\"), got: {}",
                self.extension
            ));
        }
        Ok(())
    }

    /// The catalog path this configuration points at
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => DatabaseConnection::default_database_path(),
        }
    }
}
