pub mod schema;

pub use schema::{CompletionConfig, RelayConfig};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Name of the config file inside the home directory.
pub const CONFIG_FILE_NAME: &str = "toolrelay.toml";

/// Default toolrelay home directory (~/.toolrelay).
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".toolrelay"))
        .unwrap_or_else(|| PathBuf::from(".toolrelay"))
}

/// Load config from the given path, or return defaults.
pub fn load_config(path: &Path) -> Result<RelayConfig> {
    if path.exists() {
        let contents =
            std::fs::read_to_string(path).context("Failed to read toolrelay config file")?;
        let config: RelayConfig =
            toml::from_str(&contents).context("Failed to parse toolrelay config (TOML)")?;
        Ok(config)
    } else {
        Ok(RelayConfig::default())
    }
}

/// Save config to the given path (TOML format).
pub fn save_config(config: &RelayConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents).context("Failed to write config file")?;
    Ok(())
}
