//! Application configuration types for formbot.
//!
//! `AppConfig` represents the top-level `formbot.toml`. Every section and
//! field has a default, so an empty file (or no file) is a valid config.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub keyboard: KeyboardConfig,
    #[serde(default)]
    pub localization: LocalizationConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which state storage implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// SQLite URL; when absent the database lives in the data directory.
    #[serde(default)]
    pub database_url: Option<String>,
    /// Lifetime of an untouched wizard state. Abandoned forms expire after it.
    #[serde(default = "default_state_ttl_secs")]
    pub state_ttl_secs: u64,
}

fn default_state_ttl_secs() -> u64 {
    24 * 60 * 60
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            database_url: None,
            state_ttl_secs: default_state_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyboardConfig {
    /// Reply keyboard buttons are laid out in rows of this size.
    #[serde(default = "default_buttons_per_row")]
    pub buttons_per_row: usize,
}

fn default_buttons_per_row() -> usize {
    6
}

impl Default for KeyboardConfig {
    fn default() -> Self {
        Self {
            buttons_per_row: default_buttons_per_row(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalizationConfig {
    #[serde(default = "default_locale")]
    pub default_locale: String,
    /// Directory with `<locale>.toml` catalogs; relative paths resolve
    /// against the data directory.
    #[serde(default = "default_catalog_dir")]
    pub catalog_dir: String,
}

fn default_locale() -> String {
    "en".to_string()
}

fn default_catalog_dir() -> String {
    "locales".to_string()
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            default_locale: default_locale(),
            catalog_dir: default_catalog_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Emit one JSON object per line instead of human-readable output.
    #[serde(default)]
    pub json: bool,
    /// Bridge spans to OpenTelemetry (stdout exporter).
    #[serde(default)]
    pub otel: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            otel: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.state_ttl_secs, 86_400);
        assert_eq!(config.keyboard.buttons_per_row, 6);
        assert_eq!(config.localization.default_locale, "en");
        assert_eq!(config.server.port, 8080);
        assert!(!config.logging.json);
    }

    #[test]
    fn test_app_config_deserialize_empty() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.storage.state_ttl_secs, 86_400);
        assert!(config.storage.database_url.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_app_config_deserialize_with_values() {
        let toml_str = r#"
[storage]
backend = "memory"
state_ttl_secs = 600

[keyboard]
buttons_per_row = 3

[localization]
default_locale = "ru"

[server]
port = 9000

[logging]
json = true
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.state_ttl_secs, 600);
        assert_eq!(config.keyboard.buttons_per_row, 3);
        assert_eq!(config.localization.default_locale, "ru");
        assert_eq!(config.localization.catalog_dir, "locales");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert!(config.logging.json);
        assert!(!config.logging.otel);
    }
}
