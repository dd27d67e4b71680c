//! # Application Configuration Module
//!
//! Settings live in a JSON document with four sections (`app`, `scraper`,
//! `pdf`, `ui`). A user file overrides the built-in defaults key by key, so a
//! file that only sets `scraper.timeout_secs` keeps every other default.
//!
//! ## Key Components
//!
//! - `Config`: the loaded settings plus the file they persist to
//! - `merge`: recursive default/user merge
//! - Typed views (`fetcher_config`, `report_config`) for the scan pipeline
//!
//! Writing the file is best effort. A failed write is logged and otherwise
//! ignored, so configuration problems never abort a scan.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::fetcher::{DEFAULT_USER_AGENT, FetcherConfig};
use crate::report::{DEFAULT_HIGHLIGHT_COLOR, PageSize, ReportConfig};

/// Directory under the home directory holding the config file
pub const CONFIG_DIR_NAME: &str = ".pagegrep";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Loaded application settings
#[derive(Debug, Clone)]
pub struct Config {
    path: Option<PathBuf>,
    values: Value,
}

impl Default for Config {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl Config {
    /// Built-in defaults
    pub fn defaults() -> Value {
        let save_path = dirs::desktop_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        json!({
            "app": {
                "name": "pagegrep",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "scraper": {
                "timeout_secs": 15,
                "user_agent": DEFAULT_USER_AGENT,
                "accept_language": "tr-TR,tr;q=0.9,en-US;q=0.8,en;q=0.7",
                "context_length": 300,
            },
            "pdf": {
                "page_size": "A4",
                "margin_top": 72,
                "margin_bottom": 72,
                "margin_left": 72,
                "margin_right": 72,
                "font_size": 10,
                "highlight_color": DEFAULT_HIGHLIGHT_COLOR,
                "font_dir": null,
            },
            "ui": {
                "default_save_path": save_path.to_string_lossy(),
            },
        })
    }

    /// Default location of the user config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Defaults only, never written anywhere
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Self::defaults(),
        }
    }

    /// Load from the default user location
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(path),
            None => {
                warn!("No home directory; using in-memory configuration");
                Self::in_memory()
            }
        }
    }

    /// Load from `path`, merging it over the defaults
    ///
    /// A missing file is created with the defaults. An unreadable or invalid
    /// file is ignored in favour of the defaults.
    pub fn load_from(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut values = Self::defaults();

        if path.exists() {
            match read_json(&path) {
                Ok(user) => {
                    merge(&mut values, user);
                    debug!("Loaded configuration from {}", path.display());
                }
                Err(e) => warn!("Ignoring configuration file {}: {}", path.display(), e),
            }
            return Self {
                path: Some(path),
                values,
            };
        }

        let config = Self {
            path: Some(path),
            values,
        };
        config.persist();
        config
    }

    /// File the configuration persists to, if any
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The whole settings document
    pub fn values(&self) -> &Value {
        &self.values
    }

    /// Look up a dotted key path such as `scraper.timeout_secs`
    pub fn get(&self, key: &str) -> Option<&Value> {
        key.split('.')
            .try_fold(&self.values, |value, part| value.get(part))
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Set a dotted key path, creating intermediate sections, then persist
    pub fn set(&mut self, key: &str, value: Value) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(Error::Config(format!("invalid key: {key:?}")));
        }

        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| Error::Config("empty key".to_string()))?;
        let mut node = &mut self.values;
        for part in parents {
            let object = node
                .as_object_mut()
                .ok_or_else(|| Error::Config(format!("{key}: {part} is not a section")))?;
            node = object
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        node.as_object_mut()
            .ok_or_else(|| Error::Config(format!("{key}: parent is not a section")))?
            .insert(last.to_string(), value);

        self.persist();
        Ok(())
    }

    /// Write the configuration file
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Config(format!("{}: {}", parent.display(), e)))?;
        }
        let json = serde_json::to_string_pretty(&self.values)
            .map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!("Could not save configuration: {}", e);
        }
    }

    /// Fetcher settings from the `scraper` section
    pub fn fetcher_config(&self) -> FetcherConfig {
        let defaults = FetcherConfig::default();
        FetcherConfig::builder()
            .timeout_secs(self.get_u64("scraper.timeout_secs").unwrap_or(defaults.timeout_secs))
            .user_agent(
                self.get_str("scraper.user_agent")
                    .unwrap_or(&defaults.user_agent),
            )
            .accept_language(
                self.get_str("scraper.accept_language")
                    .unwrap_or(&defaults.accept_language),
            )
            .build()
    }

    /// Characters of context on each side of a match
    pub fn context_radius(&self) -> usize {
        let length = self.get_u64("scraper.context_length").unwrap_or(300);
        usize::try_from(length / 2).unwrap_or(usize::MAX)
    }

    /// Report settings from the `pdf` section
    pub fn report_config(&self) -> ReportConfig {
        let defaults = ReportConfig::default();
        let number = |key: &str, fallback: f32| {
            self.get_f64(key)
                .map(|v| v as f32)
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(fallback)
        };

        let page_size = match self.get_str("pdf.page_size").map(str::parse::<PageSize>) {
            Some(Ok(size)) => size,
            Some(Err(e)) => {
                warn!("{}; using A4", e);
                PageSize::A4
            }
            None => defaults.page_size,
        };

        let mut builder = ReportConfig::builder()
            .page_size(page_size)
            .margins(
                number("pdf.margin_top", defaults.margin_top),
                number("pdf.margin_bottom", defaults.margin_bottom),
                number("pdf.margin_left", defaults.margin_left),
                number("pdf.margin_right", defaults.margin_right),
            )
            .font_size(number("pdf.font_size", defaults.font_size).max(4.0))
            .highlight_color(
                self.get_str("pdf.highlight_color")
                    .unwrap_or(&defaults.highlight_color),
            );
        if let Some(dir) = self.get_str("pdf.font_dir").filter(|d| !d.trim().is_empty()) {
            builder = builder.font_dir(dir.trim());
        }
        builder.build()
    }

    /// Directory reports are saved to when none is given
    pub fn default_save_path(&self) -> PathBuf {
        self.get_str("ui.default_save_path")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Merge `user` into `base`: nested objects are merged key by key, anything
/// else in `user` replaces the value in `base`
pub fn merge(base: &mut Value, user: Value) {
    match (base, user) {
        (Value::Object(base), Value::Object(user)) => {
            for (key, value) in user {
                let nested = value.is_object() && base.get(&key).is_some_and(Value::is_object);
                match base.get_mut(&key) {
                    Some(existing) if nested => merge(existing, value),
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, user) => *base = user,
    }
}

/// Parse a command-line value: JSON when it parses, a string otherwise
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn read_json(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config::load_from(&path);

        assert!(path.exists());
        assert_eq!(config.get_u64("scraper.timeout_secs"), Some(15));
        let written: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["pdf"]["page_size"], "A4");
    }

    #[test]
    fn test_user_file_is_merged_over_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"scraper": {"timeout_secs": 5}, "extra": {"flag": true}}"#,
        )
        .unwrap();

        let config = Config::load_from(&path);

        assert_eq!(config.get_u64("scraper.timeout_secs"), Some(5));
        assert_eq!(config.get_u64("scraper.context_length"), Some(300));
        assert_eq!(config.get("extra.flag"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = Config::load_from(&path);

        assert_eq!(config.get_u64("scraper.timeout_secs"), Some(15));
        // The broken file is left alone
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_set_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::load_from(&path);
        config.set("scraper.timeout_secs", json!(42)).unwrap();
        config.set("new.section.value", json!("x")).unwrap();

        let reloaded = Config::load_from(&path);
        assert_eq!(reloaded.get_u64("scraper.timeout_secs"), Some(42));
        assert_eq!(reloaded.get_str("new.section.value"), Some("x"));
    }

    #[test]
    fn test_set_through_scalar_fails() {
        let mut config = Config::in_memory();
        let result = config.set("scraper.timeout_secs.inner", json!(1));
        assert!(matches!(result, Err(Error::Config(_))));
        assert!(matches!(config.set("a..b", json!(1)), Err(Error::Config(_))));
    }

    #[test]
    fn test_get_missing_key() {
        let config = Config::in_memory();
        assert!(config.get("scraper.nope").is_none());
        assert!(config.get("app.name.deeper").is_none());
    }

    #[test]
    fn test_merge_is_recursive() {
        let mut base = json!({"a": {"b": 1, "c": 2}, "d": 3});
        merge(&mut base, json!({"a": {"c": 20}, "d": {"e": 4}}));
        assert_eq!(base, json!({"a": {"b": 1, "c": 20}, "d": {"e": 4}}));
    }

    #[test]
    fn test_typed_views() {
        let mut config = Config::in_memory();
        config.set("scraper.timeout_secs", json!(7)).unwrap();
        config.set("scraper.context_length", json!(100)).unwrap();
        config.set("pdf.page_size", json!("Letter")).unwrap();
        config.set("pdf.font_size", json!(12)).unwrap();

        assert_eq!(config.fetcher_config().timeout_secs, 7);
        assert_eq!(config.context_radius(), 50);
        let report = config.report_config();
        assert_eq!(report.page_size, PageSize::Letter);
        assert_eq!(report.font_size, 12.0);
        assert!(report.font_dir.is_none());

        config.set("pdf.font_dir", json!("/opt/fonts")).unwrap();
        assert_eq!(
            config.report_config().font_dir,
            Some(PathBuf::from("/opt/fonts"))
        );
    }

    #[test]
    fn test_zero_timeout_is_not_used_as_is() {
        let mut config = Config::in_memory();
        config.set("scraper.timeout_secs", json!(0)).unwrap();
        let fetcher = config.fetcher_config();
        assert_eq!(fetcher.timeout_secs, 1);
        assert_eq!(fetcher.timeout(), std::time::Duration::from_secs(1));
    }

    #[test]
    fn test_default_save_path_follows_ui_section() {
        let mut config = Config::in_memory();
        config.set("ui.default_save_path", json!("/tmp/reports")).unwrap();
        assert_eq!(config.default_save_path(), PathBuf::from("/tmp/reports"));
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("30"), json!(30));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("#ff0000"), json!("#ff0000"));
    }
}
