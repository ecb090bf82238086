//! CLI utility functions.

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

use crate::config::Settings;

/// Load settings: defaults < file < environment
pub fn load_settings(config_path: Option<PathBuf>) -> Result<Settings> {
    if let Some(path) = &config_path {
        info!("Using custom config file: {}", path.display());
    }
    Settings::load(config_path.as_deref())
}

/// Where `init` writes: the explicit path, or the default location
pub fn target_config_path(config_path: Option<PathBuf>) -> PathBuf {
    config_path.unwrap_or_else(Settings::config_path)
}
