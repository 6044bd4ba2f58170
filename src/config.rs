use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

use crate::contract::DEFAULT_AUTHORITY;
use crate::db::DATABASE_NAME;
use crate::money::{DEFAULT_CURRENCY_SYMBOL, DEFAULT_MAX_PRICE_DECIMALS, DEFAULT_MAX_PRICE_DIGITS};

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".bookshop-inventory";
/// Optional settings file stored inside the data directory.
const CONFIG_FILE_NAME: &str = "config.toml";
/// Log file written next to the database while the TUI owns the terminal.
pub const LOG_FILE_NAME: &str = "bookshop.log";

/// Settings read from `config.toml`. Every key is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database file; defaults to `bookshop.db` in the data directory.
    pub database_path: Option<PathBuf>,
    /// Authority part of every resource identifier.
    pub authority: String,
    pub currency_symbol: String,
    pub max_price_digits: usize,
    pub max_price_decimals: usize,
    /// Prefix that replaces the leading trunk digit when dialling a supplier.
    pub country_code: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            authority: DEFAULT_AUTHORITY.to_string(),
            currency_symbol: DEFAULT_CURRENCY_SYMBOL.to_string(),
            max_price_digits: DEFAULT_MAX_PRICE_DIGITS,
            max_price_decimals: DEFAULT_MAX_PRICE_DECIMALS,
            country_code: "+44".to_string(),
        }
    }
}

impl AppConfig {
    /// Read `config.toml` from the data directory, falling back to defaults
    /// when the file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&data_dir()?.join(CONFIG_FILE_NAME))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config in {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if config.authority.trim().is_empty() || config.authority.contains('/') {
            return Err(anyhow!("authority must be a non-empty name without '/'"));
        }
        Ok(config)
    }

    /// Where the SQLite file lives for this configuration.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join(DATABASE_NAME)),
        }
    }
}

/// Resolve the application data directory inside the user's home.
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}
