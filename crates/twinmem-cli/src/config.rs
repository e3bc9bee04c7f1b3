//! Configuration loading from `~/.twinmem/config.toml` with defaults.

use std::path::{Path, PathBuf};
use tracing::info;
use twinmem_types::config::TwinConfig;

/// Default data directory: `~/.twinmem`.
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".twinmem")
}

/// Resolve the ledger database path from config or the default location.
pub fn ledger_path(config: &TwinConfig) -> PathBuf {
    config
        .ledger_path
        .clone()
        .unwrap_or_else(|| data_dir().join("questions.db"))
}

/// Load session configuration from a TOML file, with defaults.
///
/// A missing file is normal; a malformed one logs a warning and falls back
/// to defaults rather than failing the session.
pub fn load_config(path: Option<&Path>) -> TwinConfig {
    let config_path = path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| data_dir().join("config.toml"));

    if config_path.exists() {
        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<TwinConfig>(&contents) {
                Ok(config) => {
                    info!(path = %config_path.display(), "Loaded configuration");
                    return config;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        path = %config_path.display(),
                        "Failed to parse config, using defaults"
                    );
                }
            },
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %config_path.display(),
                    "Failed to read config file, using defaults"
                );
            }
        }
    } else {
        info!(
            path = %config_path.display(),
            "Config file not found, using defaults"
        );
    }

    TwinConfig::default()
}
