//! TOML translation catalogs.
//!
//! Each `<locale>.toml` file in the catalog directory maps translation keys to
//! text. Dotted keys may be written flat (`"commands.cancel.success" = ".."`)
//! or as nested tables; both resolve to the same dotted key.

use std::collections::HashMap;
use std::path::Path;

use formbot_core::locale::Localizer;

type Catalog = HashMap<String, String>;

/// Localizer over catalogs loaded once at startup.
///
/// Lookup order: the requested locale, then the default locale, then the key
/// itself.
#[derive(Debug, Clone, Default)]
pub struct CatalogLocalizer {
    default_locale: String,
    catalogs: HashMap<String, Catalog>,
}

impl CatalogLocalizer {
    pub fn new(default_locale: impl Into<String>) -> Self {
        Self {
            default_locale: default_locale.into(),
            catalogs: HashMap::new(),
        }
    }

    /// Loads every `*.toml` file in `dir`. A missing directory yields an
    /// empty localizer; unreadable or malformed files are skipped with a
    /// warning.
    pub async fn load(dir: &Path, default_locale: impl Into<String>) -> Self {
        let mut localizer = Self::new(default_locale);

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No catalog directory at {}, translations disabled", dir.display());
                return localizer;
            }
            Err(err) => {
                tracing::warn!("Failed to read {}: {err}, translations disabled", dir.display());
                return localizer;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!("Failed to list {}: {err}", dir.display());
                    break;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!("Failed to read catalog {}: {err}", path.display());
                    continue;
                }
            };
            match localizer.insert_toml(locale, &content) {
                Ok(count) => tracing::debug!(locale, count, "catalog loaded"),
                Err(err) => tracing::warn!("Failed to parse catalog {}: {err}", path.display()),
            }
        }

        tracing::info!(
            locales = ?localizer.locales(),
            default_locale = %localizer.default_locale,
            "translation catalogs loaded"
        );
        localizer
    }

    /// Parses `content` as the catalog of `locale`, merging into any keys
    /// already loaded for it. Returns the number of keys read.
    pub fn insert_toml(&mut self, locale: &str, content: &str) -> Result<usize, toml::de::Error> {
        let table: toml::Table = toml::from_str(content)?;
        let mut flat = Catalog::new();
        flatten("", &table, &mut flat);
        let count = flat.len();
        self.catalogs
            .entry(locale.to_string())
            .or_default()
            .extend(flat);
        Ok(count)
    }

    /// Locales with a loaded catalog, sorted.
    pub fn locales(&self) -> Vec<String> {
        let mut locales: Vec<String> = self.catalogs.keys().cloned().collect();
        locales.sort();
        locales
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        self.catalogs.get(locale)?.get(key).map(String::as_str)
    }
}

fn flatten(prefix: &str, table: &toml::Table, out: &mut Catalog) {
    for (key, value) in table {
        let full = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::String(text) => {
                out.insert(full, text.clone());
            }
            toml::Value::Table(nested) => flatten(&full, nested, out),
            other => {
                out.insert(full, other.to_string());
            }
        }
    }
}

impl Localizer for CatalogLocalizer {
    fn tr(&self, locale: &str, key: &str) -> String {
        self.lookup(locale, key)
            .or_else(|| self.lookup(&self.default_locale, key))
            .map_or_else(|| key.to_string(), str::to_string)
    }
}
