//! Configuration management
//!
//! This module handles loading and parsing configuration for the lost-and-found board.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Entity store configuration
    #[serde(default)]
    pub store: StoreConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Bootstrap administrator account
    #[serde(default)]
    pub admin: AdminConfig,
    /// Image upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
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
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Entity store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store driver (sqlite or memory)
    #[serde(default)]
    pub driver: StoreDriver,
    /// SQLite connection URL or file path
    #[serde(default = "default_store_url")]
    pub url: String,
    /// JSON snapshot file for the memory driver (optional)
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            driver: StoreDriver::default(),
            url: default_store_url(),
            snapshot_path: None,
        }
    }
}

fn default_store_url() -> String {
    "data/lostfound.db".to_string()
}

/// Store driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreDriver {
    /// SQLite through sqlx (default)
    #[default]
    Sqlite,
    /// In-process tables, optionally mirrored to a local JSON file
    Memory,
}

impl std::fmt::Display for StoreDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreDriver::Sqlite => write!(f, "sqlite"),
            StoreDriver::Memory => write!(f, "memory"),
        }
    }
}

/// Longest session lifetime accepted, in days
pub const MAX_SESSION_DAYS: i64 = 3650;

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign session tokens. A random one is generated per
    /// process when unset, which invalidates tokens on restart.
    #[serde(default)]
    pub token_secret: Option<String>,
    /// Session token lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
    /// Store account secrets as Argon2id hashes instead of verbatim
    #[serde(default = "default_hash_secrets")]
    pub hash_secrets: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: None,
            session_days: default_session_days(),
            hash_secrets: default_hash_secrets(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

fn default_hash_secrets() -> bool {
    true
}

/// Bootstrap administrator account, created at startup when no admin exists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_username")]
    pub username: String,
    #[serde(default = "default_admin_secret")]
    pub secret: String,
    #[serde(default = "default_admin_full_name")]
    pub full_name: String,
    #[serde(default = "default_admin_location")]
    pub location: String,
    #[serde(default = "default_admin_contact")]
    pub contact_number: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            username: default_admin_username(),
            secret: default_admin_secret(),
            full_name: default_admin_full_name(),
            location: default_admin_location(),
            contact_number: default_admin_contact(),
        }
    }
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_secret() -> String {
    "admin123".to_string()
}

fn default_admin_full_name() -> String {
    "Administrator".to_string()
}

fn default_admin_location() -> String {
    "Local Government Unit".to_string()
}

fn default_admin_contact() -> String {
    "N/A".to_string()
}

/// Upload configuration for inline image blobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum decoded image size in bytes (default: 5MB)
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: default_max_image_bytes(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(mime_type))
    }
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
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
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

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - LOSTFOUND_SERVER_HOST / _PORT / _CORS_ORIGIN
    /// - LOSTFOUND_STORE_DRIVER / _URL / _SNAPSHOT_PATH
    /// - LOSTFOUND_AUTH_TOKEN_SECRET / _SESSION_DAYS / _HASH_SECRETS
    /// - LOSTFOUND_ADMIN_USERNAME / _SECRET
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would leave the service unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin.username.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "admin.username cannot be empty".to_string(),
            ));
        }
        if self.admin.secret.is_empty() {
            return Err(ConfigError::ValidationError(
                "admin.secret cannot be empty".to_string(),
            ));
        }
        if !(1..=MAX_SESSION_DAYS).contains(&self.auth.session_days) {
            return Err(ConfigError::ValidationError(format!(
                "auth.session_days must be between 1 and {}",
                MAX_SESSION_DAYS
            )));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("LOSTFOUND_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("LOSTFOUND_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("LOSTFOUND_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("LOSTFOUND_STORE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.store.driver = StoreDriver::Sqlite,
                "memory" => self.store.driver = StoreDriver::Memory,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("LOSTFOUND_STORE_URL") {
            self.store.url = url;
        }
        if let Ok(path) = std::env::var("LOSTFOUND_STORE_SNAPSHOT_PATH") {
            self.store.snapshot_path = Some(PathBuf::from(path));
        }

        if let Ok(secret) = std::env::var("LOSTFOUND_AUTH_TOKEN_SECRET") {
            self.auth.token_secret = Some(secret);
        }
        if let Ok(days) = std::env::var("LOSTFOUND_AUTH_SESSION_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                self.auth.session_days = days;
            }
        }
        if let Ok(flag) = std::env::var("LOSTFOUND_AUTH_HASH_SECRETS") {
            if let Ok(flag) = flag.parse::<bool>() {
                self.auth.hash_secrets = flag;
            }
        }

        if let Ok(username) = std::env::var("LOSTFOUND_ADMIN_USERNAME") {
            self.admin.username = username;
        }
        if let Ok(secret) = std::env::var("LOSTFOUND_ADMIN_SECRET") {
            self.admin.secret = secret;
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
