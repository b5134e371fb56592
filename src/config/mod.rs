//! Configuration management
//!
//! Configuration is loaded from `config.yml` and then overridden by
//! `MINBAR_<SECTION>_<KEY>` environment variables. Missing values are filled
//! with defaults, so an absent or empty file yields a runnable setup.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub oembed: OEmbedConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the admin frontends send cookies)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Public base URL, used for sitemap and robots.txt links
    #[serde(default = "default_site_url")]
    pub site_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            site_url: default_site_url(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_site_url() -> String {
    "http://localhost:8080".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub driver: DatabaseDriver,
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/minbar.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Sqlite,
    Mysql,
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub driver: CacheDriver,
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: CacheDriver::default(),
            redis_url: None,
            ttl_seconds: default_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    300
}

/// Cache driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    #[default]
    Memory,
    Redis,
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Public directory uploaded files are written to
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Maximum file size in bytes (default: 50MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("public/uploads")
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    [
        "image/jpeg",
        "image/png",
        "image/gif",
        "image/webp",
        "image/svg+xml",
        "application/pdf",
        "audio/mpeg",
        "audio/mp4",
        "audio/wav",
        "audio/ogg",
        "video/mp4",
        "video/webm",
    ]
    .iter()
    .map(|t| t.to_string())
    .collect()
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t.eq_ignore_ascii_case(mime_type))
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            "application/pdf" => "pdf",
            "audio/mpeg" => "mp3",
            "audio/mp4" => "m4a",
            "audio/wav" => "wav",
            "audio/ogg" => "ogg",
            "video/mp4" => "mp4",
            "video/webm" => "webm",
            _ => "bin",
        }
    }
}

/// Authentication configuration for both admin panels
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for CMS admin tokens. Generated per process when absent.
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// Lifetime of CMS admin tokens in hours
    #[serde(default = "default_jwt_ttl_hours")]
    pub jwt_ttl_hours: i64,
    /// Lifetime of shop admin sessions in days
    #[serde(default = "default_shop_session_days")]
    pub shop_session_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_ttl_hours: default_jwt_ttl_hours(),
            shop_session_days: default_shop_session_days(),
        }
    }
}

fn default_jwt_ttl_hours() -> i64 {
    24
}

fn default_shop_session_days() -> i64 {
    7
}

/// YouTube oEmbed lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OEmbedConfig {
    #[serde(default = "default_youtube_endpoint")]
    pub youtube_endpoint: String,
    #[serde(default = "default_oembed_timeout")]
    pub timeout_seconds: u64,
}

impl Default for OEmbedConfig {
    fn default() -> Self {
        Self {
            youtube_endpoint: default_youtube_endpoint(),
            timeout_seconds: default_oembed_timeout(),
        }
    }
}

fn default_youtube_endpoint() -> String {
    "https://www.youtube.com/oembed".to_string()
}

fn default_oembed_timeout() -> u64 {
    10
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
}

impl Config {
    /// Load configuration from file.
    ///
    /// A missing or empty file yields the defaults; invalid YAML is an error
    /// carrying the line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        Ok(config)
    }

    /// Load configuration from file, then apply `MINBAR_*` environment overrides.
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MINBAR_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MINBAR_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("MINBAR_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }
        if let Ok(site_url) = std::env::var("MINBAR_SERVER_SITE_URL") {
            self.server.site_url = site_url;
        }

        if let Ok(driver) = std::env::var("MINBAR_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {}
            }
        }
        if let Ok(url) = std::env::var("MINBAR_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(driver) = std::env::var("MINBAR_CACHE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "memory" => self.cache.driver = CacheDriver::Memory,
                "redis" => self.cache.driver = CacheDriver::Redis,
                _ => {}
            }
        }
        if let Ok(redis_url) = std::env::var("MINBAR_CACHE_REDIS_URL") {
            self.cache.redis_url = Some(redis_url);
        }
        if let Ok(ttl) = std::env::var("MINBAR_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(path) = std::env::var("MINBAR_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }
        if let Ok(size) = std::env::var("MINBAR_UPLOAD_MAX_FILE_SIZE") {
            if let Ok(size) = size.parse::<u64>() {
                self.upload.max_file_size = size;
            }
        }

        if let Ok(secret) = std::env::var("MINBAR_AUTH_JWT_SECRET") {
            if !secret.is_empty() {
                self.auth.jwt_secret = Some(secret);
            }
        }
        if let Ok(hours) = std::env::var("MINBAR_AUTH_JWT_TTL_HOURS") {
            if let Ok(hours) = hours.parse::<i64>() {
                if hours > 0 {
                    self.auth.jwt_ttl_hours = hours;
                }
            }
        }
    }
}

/// Format YAML parsing error with location
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!("at line {}, column {}: {}", location.line(), location.column(), e)
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_KEYS: &[&str] = &[
        "MINBAR_SERVER_HOST",
        "MINBAR_SERVER_PORT",
        "MINBAR_SERVER_CORS_ORIGIN",
        "MINBAR_SERVER_SITE_URL",
        "MINBAR_DATABASE_DRIVER",
        "MINBAR_DATABASE_URL",
        "MINBAR_CACHE_DRIVER",
        "MINBAR_CACHE_REDIS_URL",
        "MINBAR_CACHE_TTL_SECONDS",
        "MINBAR_UPLOAD_PATH",
        "MINBAR_UPLOAD_MAX_FILE_SIZE",
        "MINBAR_AUTH_JWT_SECRET",
        "MINBAR_AUTH_JWT_TTL_HOURS",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
        guard
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let config = Config::load(std::path::Path::new("nonexistent_minbar.yml")).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.database.url, "data/minbar.db");
        assert_eq!(config.cache.driver, CacheDriver::Memory);
        assert_eq!(config.upload.max_file_size, 50 * 1024 * 1024);
        assert_eq!(config.auth.jwt_ttl_hours, 24);
        assert!(config.auth.jwt_secret.is_none());
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "   \n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.oembed.youtube_endpoint, "https://www.youtube.com/oembed");
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3000\nupload:\n  max_file_size: 1024\n").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.upload.max_file_size, 1024);
        assert!(config.upload.is_type_allowed("application/pdf"));
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err().to_string();
        assert!(err.contains("parse"));
    }

    #[test]
    fn test_env_override_server_and_auth() {
        let _guard = lock_env();
        let file = NamedTempFile::new().unwrap();

        std::env::set_var("MINBAR_SERVER_PORT", "4000");
        std::env::set_var("MINBAR_SERVER_SITE_URL", "https://example.org");
        std::env::set_var("MINBAR_AUTH_JWT_SECRET", "from-env");

        let config = Config::load_with_env(file.path()).unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.site_url, "https://example.org");
        assert_eq!(config.auth.jwt_secret.as_deref(), Some("from-env"));

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 8081\n").unwrap();

        std::env::set_var("MINBAR_SERVER_PORT", "not_a_number");
        std::env::set_var("MINBAR_DATABASE_DRIVER", "oracle");
        std::env::set_var("MINBAR_AUTH_JWT_TTL_HOURS", "-3");

        let config = Config::load_with_env(file.path()).unwrap();
        assert_eq!(config.server.port, 8081);
        assert_eq!(config.database.driver, DatabaseDriver::Sqlite);
        assert_eq!(config.auth.jwt_ttl_hours, 24);

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_upload_type_check_is_case_insensitive() {
        let config = UploadConfig::default();
        assert!(config.is_type_allowed("IMAGE/PNG"));
        assert!(!config.is_type_allowed("application/x-msdownload"));
        assert_eq!(config.get_extension("audio/mpeg"), "mp3");
        assert_eq!(config.get_extension("text/plain"), "bin");
    }
}
