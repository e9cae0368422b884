//! Application configuration (`config.toml`) with environment overrides.
//!
//! ```toml
//! [backend]
//! url = "https://project.supabase.co"
//! anon_key = "..."
//! redirect_url = "https://app.example.com"
//! timeout_secs = 10
//!
//! [logging]
//! level = "info"
//! file = true
//!
//! [browse]
//! page_size = 4
//! ```

use estate_core::error::{EstateError, Result};
use estate_core::pagination::PAGE_SIZE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::paths::EstatePaths;

pub const ENV_BACKEND_URL: &str = "SUPABASE_URL";
pub const ENV_BACKEND_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_REDIRECT_URL: &str = "ESTATE_REDIRECT_URL";

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Hosted backend connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub anon_key: Option<String>,
    /// Where confirmation emails send the user after sign-up.
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: None,
            anon_key: None,
            redirect_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl BackendConfig {
    /// URL and anon key, when both are present and non-empty.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let url = self.url.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let key = self
            .anon_key
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())?;
        Some((url.trim_end_matches('/'), key))
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write a daily rolling log file under the config directory.
    #[serde(default)]
    pub file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowseConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    PAGE_SIZE
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
        }
    }
}

/// Root of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub browse: BrowseConfig,
}

impl AppConfig {
    /// Loads the config file at `path`; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("[AppConfig] No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            EstateError::config(format!(
                "Failed to read configuration file at {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config: AppConfig = toml::from_str(&content)?;
        if config.browse.page_size == 0 {
            return Err(EstateError::config("browse.page_size must be at least 1"));
        }
        config.backend.url = config.backend.url.map(|u| u.trim_end_matches('/').to_string());
        Ok(config)
    }

    /// Loads `~/.config/estate/config.toml` and applies environment overrides.
    pub fn load() -> Result<Self> {
        let path = EstatePaths::config_file()?;
        let mut config = Self::load_from(&path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies `SUPABASE_URL`, `SUPABASE_ANON_KEY` and `ESTATE_REDIRECT_URL`.
    ///
    /// Environment values take priority over the file.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = non_empty(ENV_BACKEND_URL) {
            self.backend.url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(key) = non_empty(ENV_BACKEND_ANON_KEY) {
            self.backend.anon_key = Some(key);
        }
        if let Some(redirect) = non_empty(ENV_REDIRECT_URL) {
            self.backend.redirect_url = Some(redirect);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.browse.page_size, 4);
        assert_eq!(config.backend.timeout(), Duration::from_secs(10));
        assert!(!config.backend.is_configured());
    }

    #[test]
    fn test_load_full_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[backend]
url = "https://demo.supabase.co/"
anon_key = "anon"
timeout_secs = 3

[logging]
level = "debug"
file = true

[browse]
page_size = 6
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(
            config.backend.credentials(),
            Some(("https://demo.supabase.co", "anon"))
        );
        assert_eq!(config.backend.timeout(), Duration::from_secs(3));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.file);
        assert_eq!(config.browse.page_size, 6);
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[browse]\npage_size = 0\n").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, EstateError::Config(_)));
    }

    #[test]
    fn test_invalid_toml_is_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[backend\nurl = 1").unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, EstateError::Serialization { .. }));
    }

    #[test]
    fn test_env_overrides_take_priority() {
        let mut config = AppConfig::default();
        config.backend.url = Some("https://file.example".to_string());
        let env = HashMap::from([
            (ENV_BACKEND_URL, "https://env.example/"),
            (ENV_BACKEND_ANON_KEY, "env-key"),
            (ENV_REDIRECT_URL, "  "),
        ]);
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.backend.url.as_deref(), Some("https://env.example"));
        assert_eq!(config.backend.anon_key.as_deref(), Some("env-key"));
        assert_eq!(config.backend.redirect_url, None);
    }
}
