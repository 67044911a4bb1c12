//! Configuration management for Quill.
//!
//! Parses `quill.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `auth.base_url`
//! - `auth.api_key`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "quill.toml";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the data directory.
    pub data_dir: Option<PathBuf>,
    /// Override the auth backend base URL.
    pub auth_url: Option<String>,
    /// Override the auto-backup interval in minutes.
    pub backup_interval_minutes: Option<u64>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Auth backend configuration (optional section).
    pub auth: Option<AuthConfig>,
    /// Data directory configuration (paths are relative strings from TOML).
    data: DataConfigRaw,
    /// Backup configuration.
    pub backup: BackupConfig,

    /// Resolved data configuration (set after loading).
    #[serde(skip)]
    pub data_resolved: DataConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Auth backend configuration.
#[derive(Debug, Deserialize)]
pub struct AuthConfig {
    /// Auth backend base URL.
    pub base_url: String,
    /// Public API key sent with every request.
    pub api_key: String,
}

impl AuthConfig {
    /// Validate that all required fields are properly set.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any field is empty or has an
    /// invalid format.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.base_url, "auth.base_url")?;
        require_http_url(&self.base_url, "auth.base_url")?;
        require_non_empty(&self.api_key, "auth.api_key")?;
        Ok(())
    }
}

/// Raw data configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DataConfigRaw {
    dir: Option<String>,
}

/// Resolved data configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DataConfig {
    /// Root directory for Quill data (.quill/).
    pub dir: PathBuf,
}

impl DataConfig {
    /// Key-value store directory (.quill/data/).
    #[must_use]
    pub fn kv_dir(&self) -> PathBuf {
        self.dir.join("data")
    }

    /// Asset database path (.quill/assets.db).
    #[must_use]
    pub fn asset_db_path(&self) -> PathBuf {
        self.dir.join("assets.db")
    }
}

/// Backup configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackupConfig {
    /// Auto-backup interval in minutes.
    pub interval_minutes: u64,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 10,
        }
    }
}

impl BackupConfig {
    /// Auto-backup interval as a [`Duration`].
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`auth.api_key`").
        field: String,
        /// Error message (e.g., "${`QUILL_API_KEY`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file. Otherwise,
    /// searches for `quill.toml` in the current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing
    /// CLI arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit `config_path` doesn't exist or
    /// parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(data_dir) = &settings.data_dir {
            self.data_resolved.dir.clone_from(data_dir);
        }
        if let Some(auth_url) = &settings.auth_url
            && let Some(auth) = &mut self.auth
        {
            auth.base_url.clone_from(auth_url);
        }
        if let Some(minutes) = settings.backup_interval_minutes {
            self.backup.interval_minutes = minutes;
        }
    }

    /// Get validated auth configuration.
    ///
    /// Returns the auth config if the `[auth]` section is present and all
    /// fields are valid. Use this instead of accessing the `auth` field
    /// directly when the command requires the auth backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if the section is missing or
    /// invalid.
    pub fn require_auth(&self) -> Result<&AuthConfig, ConfigError> {
        let auth = self
            .auth
            .as_ref()
            .ok_or_else(|| ConfigError::Validation("[auth] section required in config".into()))?;
        auth.validate()?;
        Ok(auth)
    }

    /// Search for the config file in the current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to the working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to the given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            auth: None,
            data: DataConfigRaw::default(),
            backup: BackupConfig::default(),
            data_resolved: DataConfig {
                dir: base.join(".quill"),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Expand environment variables in string fields that carry secrets or
    /// per-environment values.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(auth) = &mut self.auth {
            auth.base_url = expand::expand_env(&auth.base_url, "auth.base_url")?;
            auth.api_key = expand::expand_env(&auth.api_key, "auth.api_key")?;
        }
        Ok(())
    }

    /// Resolve relative paths against the config file's directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let dir = match &self.data.dir {
            Some(raw) => {
                let raw_path = PathBuf::from(raw);
                if raw_path.is_absolute() {
                    raw_path
                } else {
                    config_dir.join(raw_path)
                }
            }
            None => config_dir.join(".quill"),
        };
        self.data_resolved = DataConfig { dir };
    }
}
