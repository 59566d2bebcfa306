//! Configuration loader for formbot.
//!
//! Reads `formbot.toml` (from the data directory unless a path is given) and
//! deserializes it into [`AppConfig`]. Falls back to defaults when the file
//! is missing or malformed, then applies environment overrides.

use std::path::{Path, PathBuf};

use formbot_types::config::AppConfig;

/// File name of the configuration inside the data directory.
pub const CONFIG_FILE_NAME: &str = "formbot.toml";

/// Overrides `[keyboard] buttons_per_row`.
pub const BUTTONS_PER_ROW_ENV: &str = "BUTTONS_PER_ROW";

/// Overrides the data directory.
pub const DATA_DIR_ENV: &str = "FORMBOT_DATA_DIR";

/// `$FORMBOT_DATA_DIR`, else `~/.formbot`, else `./.formbot`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".formbot")
}

/// Load configuration from `path`, or `{data_dir}/formbot.toml` when `None`.
///
/// - A missing file yields [`AppConfig::default()`].
/// - An unreadable or unparsable file logs a warning and yields the default.
/// - `BUTTONS_PER_ROW` overrides the keyboard row width either way.
pub async fn load_config(path: Option<&Path>, data_dir: &Path) -> AppConfig {
    let config_path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join(CONFIG_FILE_NAME));

    let mut config = read_config_file(&config_path).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

async fn read_config_file(config_path: &Path) -> AppConfig {
    let content = match tokio::fs::read_to_string(config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

fn apply_env_overrides(config: &mut AppConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(raw) = var(BUTTONS_PER_ROW_ENV) {
        match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => config.keyboard.buttons_per_row = n,
            _ => tracing::warn!(
                value = %raw,
                default = config.keyboard.buttons_per_row,
                "invalid {BUTTONS_PER_ROW_ENV}, keeping configured value"
            ),
        }
    }
}

/// The SQLite URL to use: the configured one, else the data-directory file.
pub fn database_url(config: &AppConfig, data_dir: &Path) -> String {
    config
        .storage
        .database_url
        .clone()
        .unwrap_or_else(|| crate::sqlite::pool::default_database_url(data_dir))
}

/// The catalog directory, resolved against `data_dir` when relative.
pub fn catalog_dir(config: &AppConfig, data_dir: &Path) -> PathBuf {
    let dir = Path::new(&config.localization.catalog_dir);
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        data_dir.join(dir)
    }
}
