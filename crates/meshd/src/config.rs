//! Configuration management for meshd.
//!
//! Loads settings from /etc/rustdesk-mesh/config.toml (or the path in
//! `MESHD_CONFIG`), then applies environment overrides on top.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/rustdesk-mesh/config.toml";

/// Default config file path for fallback
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/rustdesk-mesh/config.toml";

/// Maximum request body size: 64 KiB
pub const MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Allowed CORS origin; the request origin is mirrored when unset
    #[serde(default)]
    pub cors_allowed_origin: Option<String>,

    /// Largest accepted request body in bytes
    #[serde(default = "default_max_body")]
    pub max_body_bytes: usize,
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_max_body() -> usize {
    MAX_BODY_SIZE
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_allowed_origin: None,
            max_body_bytes: default_max_body(),
        }
    }
}

/// Identity service and device registry (Supabase project)
#[derive(Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project base URL, e.g. https://xyz.supabase.co
    #[serde(default)]
    pub url: String,

    /// Public key, only used for the password grant
    #[serde(default)]
    pub anon_key: String,

    /// Privileged key, never leaves the daemon
    #[serde(default)]
    pub service_role_key: String,

    /// Upstream request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Ignore HTTP(S)_PROXY for upstream calls
    #[serde(default)]
    pub bypass_proxy: bool,
}

fn default_timeout() -> u64 {
    10
}

impl Default for SupabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            service_role_key: String::new(),
            timeout_secs: default_timeout(),
            bypass_proxy: false,
        }
    }
}

// Keys are masked so the config can be logged.
impl std::fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use mesh_shared::redact::masked_value;
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("anon_key", &masked_value(Some(&self.anon_key), 2, 2))
            .field("service_role_key", &masked_value(Some(&self.service_role_key), 2, 2))
            .field("timeout_secs", &self.timeout_secs)
            .field("bypass_proxy", &self.bypass_proxy)
            .finish()
    }
}

impl SupabaseConfig {
    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

/// Debug log file settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Debug log file, truncated at startup
    #[serde(default = "default_log_path")]
    pub debug_log_path: PathBuf,

    /// Write DEBUG..WARN to the file (ERROR is always written)
    #[serde(default)]
    pub debug_enabled: bool,
}

fn default_log_path() -> PathBuf {
    PathBuf::from("/var/log/rustdesk-mesh/app-debug.log")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            debug_log_path: default_log_path(),
            debug_enabled: false,
        }
    }
}

/// Full daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub supabase: SupabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    /// None of the candidate files exist
    Defaults(Vec<PathBuf>),
}

impl ConfigSource {
    /// Log the outcome. Called once the subscriber is installed.
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from {}", path.display()),
            ConfigSource::Defaults(tried) => {
                let tried: Vec<String> = tried.iter().map(|p| p.display().to_string()).collect();
                warn!("Config not found (tried {}), using defaults", tried.join(", "));
            }
        }
    }
}

impl Config {
    /// Load config from disk and the process environment.
    ///
    /// `MESHD_CONFIG` names a file that must exist; otherwise
    /// [`CONFIG_PATH`] then [`DEFAULT_CONFIG_PATH`] are tried.
    pub fn load() -> Result<(Self, ConfigSource), ConfigError> {
        let (mut config, source) = match std::env::var("MESHD_CONFIG") {
            Ok(path) => {
                let path = PathBuf::from(path);
                (Self::load_from_path(&path)?, ConfigSource::File(path))
            }
            Err(_) => Self::load_first(&[Path::new(CONFIG_PATH), Path::new(DEFAULT_CONFIG_PATH)])?,
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok((config, source))
    }

    /// Load the first candidate that exists.
    ///
    /// Only a missing file moves on to the next candidate; unreadable or
    /// malformed files are errors.
    pub fn load_first(candidates: &[&Path]) -> Result<(Self, ConfigSource), ConfigError> {
        for path in candidates {
            match Self::load_from_path(path) {
                Ok(config) => return Ok((config, ConfigSource::File(path.to_path_buf()))),
                Err(ConfigError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            }
        }
        let tried = candidates.iter().map(|p| p.to_path_buf()).collect();
        Ok((Config::default(), ConfigSource::Defaults(tried)))
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides. `lookup` returns the variable's value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("SUPABASE_URL") {
            self.supabase.url = v.trim().to_string();
        }
        if let Some(v) = var("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = v.trim().to_string();
        }
        if let Some(v) = var("SUPABASE_SERVICE_ROLE_KEY") {
            self.supabase.service_role_key = v.trim().to_string();
        }
        if let Some(v) = var("SUPABASE_CORS_ALLOWED_ORIGIN") {
            self.server.cors_allowed_origin = Some(v.trim().to_string());
        }
        if let Some(v) = var("MESHD_BIND") {
            self.server.bind = v.trim().to_string();
        }
        if let Some(v) = var("MESHD_UPSTREAM_TIMEOUT_SECS") {
            self.supabase.timeout_secs = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "MESHD_UPSTREAM_TIMEOUT_SECS",
                value: v.clone(),
            })?;
        }
        if let Some(v) = lookup("MESHD_BYPASS_PROXY") {
            self.supabase.bypass_proxy = parse_flag(Some(&v), self.supabase.bypass_proxy);
        }
        if let Some(v) = var("APP_DEBUG_LOG_PATH") {
            self.logging.debug_log_path = PathBuf::from(v.trim());
        }
        if let Some(v) = lookup("APP_DEBUG_ENABLED") {
            self.logging.debug_enabled = parse_flag(Some(&v), self.logging.debug_enabled);
        }
        Ok(())
    }

    /// Check that the daemon can talk to its upstream
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.supabase.url.trim().is_empty() {
            return Err(ConfigError::Missing("SUPABASE_URL"));
        }
        if !self.supabase.url.starts_with("http://") && !self.supabase.url.starts_with("https://") {
            return Err(ConfigError::Invalid {
                key: "SUPABASE_URL",
                value: self.supabase.url.clone(),
            });
        }
        if self.supabase.anon_key.is_empty() {
            return Err(ConfigError::Missing("SUPABASE_ANON_KEY"));
        }
        if self.supabase.service_role_key.is_empty() {
            return Err(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"));
        }
        if self.supabase.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "timeout_secs",
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// Parse a boolean flag: "1", "true" and "yes" (any case) are true, any
/// other value is false. A missing value keeps `fallback`.
pub fn parse_flag(value: Option<&str>, fallback: bool) -> bool {
    match value {
        Some(v) => matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        None => fallback,
    }
}
