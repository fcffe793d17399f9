//! Configuration loading and data folder resolution
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments (handled by the binary via clap)
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: a warning is logged and defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Database file name inside the data folder
pub const DATABASE_FILE_NAME: &str = "laudos.db";

/// Environment variable overriding the data folder
pub const DATA_FOLDER_ENV: &str = "LAUDOS_DATA_FOLDER";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Folder holding the SQLite database
    #[serde(default)]
    pub data_folder: Option<PathBuf>,

    /// Interface to bind the HTTP server to
    #[serde(default)]
    pub bind_address: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Account whose templates, phrases and variables are copied to new users
    #[serde(default)]
    pub seed_user_email: Option<String>,

    /// Allowed CORS origins (empty = allow any)
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bearer token settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// HS256 signing secret; generated and persisted in the database when absent
    #[serde(default)]
    pub jwt_secret: Option<String>,

    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,

    #[serde(default = "default_refresh_token_days")]
    pub refresh_token_days: i64,
}

impl AuthConfig {
    /// Access and refresh token lifetimes; both must be positive and in range
    pub fn token_lifetimes(&self) -> Result<(chrono::Duration, chrono::Duration)> {
        let access = Some(self.access_token_minutes)
            .filter(|m| *m > 0)
            .and_then(chrono::Duration::try_minutes)
            .ok_or_else(|| {
                Error::Config(format!(
                    "auth.access_token_minutes must be a positive number of minutes, got {}",
                    self.access_token_minutes
                ))
            })?;
        let refresh = Some(self.refresh_token_days)
            .filter(|d| *d > 0)
            .and_then(chrono::Duration::try_days)
            .ok_or_else(|| {
                Error::Config(format!(
                    "auth.refresh_token_days must be a positive number of days, got {}",
                    self.refresh_token_days
                ))
            })?;

        Ok((access, refresh))
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            access_token_minutes: default_access_token_minutes(),
            refresh_token_days: default_refresh_token_days(),
        }
    }
}

/// Language-model provider settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiConfig {
    /// Provider name: "openai", "openrouter" or "anthropic"
    #[serde(default = "default_ai_provider")]
    pub provider: String,

    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default)]
    pub openrouter_api_key: Option<String>,

    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    /// Overrides the provider's default model
    #[serde(default)]
    pub model: Option<String>,

    /// Overrides the provider's default max_tokens
    #[serde(default)]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Wrap user text in the radiology formatting instructions
    #[serde(default)]
    pub medical_context: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_ai_provider(),
            openai_api_key: None,
            openrouter_api_key: None,
            anthropic_api_key: None,
            model: None,
            max_tokens: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            medical_context: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_access_token_minutes() -> i64 {
    60
}

fn default_refresh_token_days() -> i64 {
    7
}

fn default_ai_provider() -> String {
    "openrouter".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Load configuration from an explicit path or the platform default location
    ///
    /// An explicit path that does not exist is an error; a missing default file is not.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_file() {
                Some(path) => path,
                None => {
                    warn!("No config file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let config = Self::from_file(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }
}

/// Data folder resolution:
/// 1. Command-line argument
/// 2. `LAUDOS_DATA_FOLDER`
/// 3. TOML `data_folder`
/// 4. OS-dependent compiled default
pub fn resolve_data_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.data_folder {
        return path.clone();
    }

    default_data_folder()
}

/// Database path inside a data folder
pub fn database_path(data_folder: &Path) -> PathBuf {
    data_folder.join(DATABASE_FILE_NAME)
}

/// Resolve a secret from environment first, then TOML
///
/// Blank values are ignored. Returns `(value, source)`.
pub fn resolve_secret(env_var_name: &str, toml_value: Option<&str>) -> Option<(String, &'static str)> {
    let env_value = std::env::var(env_var_name).ok();

    if let (Some(env), Some(toml)) = (&env_value, toml_value) {
        if is_valid_key(env) && is_valid_key(toml) {
            warn!(
                "{} set in both environment and TOML. Using environment (highest priority).",
                env_var_name
            );
        }
    }

    if let Some(key) = env_value {
        if is_valid_key(&key) {
            return Some((key, "environment"));
        }
    }

    toml_value
        .filter(|key| is_valid_key(key))
        .map(|key| (key.to_string(), "TOML"))
}

/// Validate a key or secret (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Get the platform configuration file path, if one exists
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("laudos").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/laudos/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Get OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/laudos (or /var/lib/laudos when there is no home)
        dirs::data_local_dir()
            .map(|d| d.join("laudos"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/laudos"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("laudos"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/laudos"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("laudos"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\laudos"))
    } else {
        PathBuf::from("./laudos_data")
    }
}
