//! Application configuration.
//!
//! Values are layered: built-in defaults, then
//! `~/.config/seatbook/config.toml`, then `SEATBOOK_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::storage::{FileStorage, DEFAULT_STORAGE_KEY};

/// Directory under the user's config dir holding `config.toml`.
pub const CONFIG_DIR: &str = "seatbook";
/// Name of the configuration file.
pub const CONFIG_FILE: &str = "config.toml";
/// Currency suffix used when none is configured.
pub const DEFAULT_CURRENCY: &str = "KRW";

/// Runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where bookings are stored.
    pub data_dir: PathBuf,
    /// Storage key of the occupancy map.
    pub storage_key: String,
    /// Suffix appended to prices.
    pub currency: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: FileStorage::default_root(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from `path` (optional) layered over defaults and the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let defaults = Self::default();
        let settings = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("storage_key", defaults.storage_key)?
            .set_default("currency", defaults.currency)?
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix("SEATBOOK"))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        settings
            .try_deserialize()
            .context("invalid seatbook configuration")
    }
}

/// Location of the user's config file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write a config file with default values if none exists yet.
pub fn ensure_default_config() -> Result<()> {
    ensure_config_at(default_config_path())
}

fn ensure_config_at(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let defaults = AppConfig::default();
    let contents = format!(
        "# seatbook configuration\ndata_dir = {:?}\nstorage_key = {:?}\ncurrency = {:?}\n",
        defaults.data_dir.to_string_lossy(),
        defaults.storage_key,
        defaults.currency
    );
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(dir.path().join("absent.toml"))?;
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.currency, DEFAULT_CURRENCY);
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "data_dir = \"/tmp/seats\"\nstorage_key = \"test-seats\"\ncurrency = \"won\"\n",
        )?;
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_dir, PathBuf::from("/tmp/seats"));
        assert_eq!(config.storage_key, "test-seats");
        assert_eq!(config.currency, "won");
        Ok(())
    }

    #[test]
    fn writes_loadable_default_file() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("seatbook").join(CONFIG_FILE);
        ensure_config_at(&path)?;
        assert!(path.exists());
        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);

        fs::write(&path, "currency = \"USD\"\n")?;
        ensure_config_at(&path)?;
        assert_eq!(AppConfig::load_from(&path)?.currency, "USD");
        Ok(())
    }
}
