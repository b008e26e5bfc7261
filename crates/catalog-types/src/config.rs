//! Configuration loading for the catalog.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/catalog/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::asset_type::AssetType;
use crate::error::CatalogError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory of the search index store
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Global type whitelist; empty means every registered type
    #[serde(default)]
    pub type_whitelist: Vec<String>,

    /// Default cap on ranked search results
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Batch size for full scans
    #[serde(default = "default_scroll_batch_size")]
    pub scroll_batch_size: usize,

    /// Idle lifetime of an open scroll cursor at the store
    #[serde(default = "default_scroll_keep_alive_secs")]
    pub scroll_keep_alive_secs: u64,

    /// Deadline applied to every index store call
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Memory budget for each index writer in MB
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,
}

fn default_index_path() -> String {
    ProjectDirs::from("", "", "catalog")
        .map(|p| p.data_local_dir().join("index"))
        .unwrap_or_else(|| PathBuf::from("./catalog-index"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_results() -> usize {
    200
}

fn default_scroll_batch_size() -> usize {
    1000
}

fn default_scroll_keep_alive_secs() -> u64 {
    30
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_writer_memory_mb() -> usize {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            log_level: default_log_level(),
            type_whitelist: Vec::new(),
            max_results: default_max_results(),
            scroll_batch_size: default_scroll_batch_size(),
            scroll_keep_alive_secs: default_scroll_keep_alive_secs(),
            request_timeout_ms: default_request_timeout_ms(),
            writer_memory_mb: default_writer_memory_mb(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/catalog/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (CATALOG_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, CatalogError> {
        let config_dir = ProjectDirs::from("", "", "catalog")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("index_path", default_index_path())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("max_results", default_max_results() as i64)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("scroll_batch_size", default_scroll_batch_size() as i64)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default(
                "scroll_keep_alive_secs",
                default_scroll_keep_alive_secs() as i64,
            )
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("request_timeout_ms", default_request_timeout_ms() as i64)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .set_default("writer_memory_mb", default_writer_memory_mb() as i64)
            .map_err(|e| CatalogError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: CATALOG_INDEX_PATH, CATALOG_MAX_RESULTS, CATALOG_TYPE_WHITELIST=table,topic
        // Keys contain underscores, so nested separators use a double underscore.
        builder = builder.add_source(
            Environment::with_prefix("CATALOG")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("type_whitelist")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| CatalogError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| CatalogError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.max_results == 0 {
            return Err(CatalogError::Config("max_results must be > 0".to_string()));
        }
        if self.scroll_batch_size == 0 {
            return Err(CatalogError::Config(
                "scroll_batch_size must be > 0".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(CatalogError::Config(
                "request_timeout_ms must be > 0".to_string(),
            ));
        }
        self.whitelist()?;
        Ok(())
    }

    /// Parse the configured global whitelist against the type registry.
    pub fn whitelist(&self) -> Result<Vec<AssetType>, CatalogError> {
        self.type_whitelist
            .iter()
            .map(|name| name.trim().parse::<AssetType>())
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn scroll_keep_alive(&self) -> Duration {
        Duration::from_secs(self.scroll_keep_alive_secs)
    }

    /// Expand ~ in index_path to the home directory
    pub fn expanded_index_path(&self) -> PathBuf {
        if let Some(rest) = self.index_path.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return PathBuf::from(home).join(rest);
            }
        }
        PathBuf::from(&self.index_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.max_results, 200);
        assert_eq!(settings.scroll_batch_size, 1000);
        assert_eq!(settings.log_level, "info");
        assert!(settings.type_whitelist.is_empty());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.max_results, 200);
    }

    #[test]
    fn test_whitelist_parsing() {
        let settings = Settings {
            type_whitelist: vec!["table".to_string(), " topic ".to_string()],
            ..Default::default()
        };
        assert_eq!(
            settings.whitelist().unwrap(),
            vec![AssetType::Table, AssetType::Topic]
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = Settings {
            type_whitelist: vec!["widget".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(CatalogError::InvalidType(_))
        ));

        settings.type_whitelist.clear();
        settings.scroll_batch_size = 0;
        assert!(matches!(settings.validate(), Err(CatalogError::Config(_))));
    }

    #[test]
    fn test_durations() {
        let settings = Settings::default();
        assert_eq!(settings.request_timeout(), Duration::from_secs(10));
        assert_eq!(settings.scroll_keep_alive(), Duration::from_secs(30));
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        let decoded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.writer_memory_mb, 50);
        assert_eq!(decoded.scroll_keep_alive_secs, 30);
    }
}
