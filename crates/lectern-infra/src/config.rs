//! Configuration loading.
//!
//! Reads `config.toml` from the data directory (`~/.lectern/` unless
//! `LECTERN_HOME` says otherwise) into [`LecternConfig`]. A missing or
//! malformed file falls back to defaults.

use std::path::{Path, PathBuf};

use lectern_types::config::LecternConfig;

pub const DATA_DIR_ENV: &str = "LECTERN_HOME";

pub const CONFIG_FILE: &str = "config.toml";

/// Resolve the data directory.
///
/// Priority:
/// 1. `LECTERN_HOME` environment variable
/// 2. `~/.lectern`
/// 3. `.lectern` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var(DATA_DIR_ENV).ok(), dirs::home_dir())
}

fn data_dir_from(env: Option<String>, home: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = env.filter(|d| !d.trim().is_empty()) {
        return PathBuf::from(dir);
    }
    match home {
        Some(home) => home.join(".lectern"),
        None => PathBuf::from(".lectern"),
    }
}

/// Load `{data_dir}/config.toml`.
///
/// Validation is left to the caller so a bad value is reported as a
/// configuration error rather than silently replaced.
pub async fn load_config(data_dir: &Path) -> LecternConfig {
    let config_path = data_dir.join(CONFIG_FILE);

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return LecternConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return LecternConfig::default();
        }
    };

    match toml::from_str::<LecternConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            LecternConfig::default()
        }
    }
}
