pub mod chat;
pub mod doctor;
pub mod init;
pub mod recommend;
pub mod schemes;
pub mod search;
pub mod stats;

use sevasaathi_catalog::Catalog;
use sevasaathi_config::AppConfig;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The config file in use: `--config` if given, else the default location.
pub fn config_file(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    debug!(path = %config_file(config_path).display(), "Loading config");
    let config = match config_path {
        Some(path) => AppConfig::load_with_overrides(path),
        None => AppConfig::load(),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

pub fn load_catalog(config: &AppConfig) -> Result<Catalog, Box<dyn std::error::Error>> {
    Catalog::load(&config.data_path).map_err(|e| {
        format!(
            "Failed to load scheme data from {}: {e}\n  Set data_path in config.toml or SEVASAATHI_DATA_PATH.",
            config.data_path
        )
        .into()
    })
}
