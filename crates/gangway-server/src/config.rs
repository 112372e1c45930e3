//! TOML configuration for the bridge server.
//!
//! Everything the bridge needs at runtime is declared here: the listen
//! address, the per-environment key URL templates, booking-system
//! connection and per-site API credentials, directory-system assertion
//! material, and the business-unit to microsite mapping with its fallback.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::Deserialize;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Cannot read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML.
    #[error("Cannot parse configuration file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but failed a consistency check.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub keys: KeysConfig,
    pub booking: BookingConfig,
    pub directory: DirectoryConfig,
    pub microsites: MicrositesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
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

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Verification-key URL templates, one per issuer environment. Each must
/// contain a literal `{kid}` placeholder.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct KeysConfig {
    pub qa_url: String,
    pub stg_url: String,
    pub prod_url: String,
    #[serde(default = "default_key_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_key_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_key_connect_timeout_ms() -> u64 {
    5_000
}

fn default_key_read_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct BookingConfig {
    /// Base URL of the booking REST API.
    pub base_url: String,
    /// Full URL of the booking login endpoint.
    pub auth_url: String,
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Per-site API credentials, keyed by site.
    #[serde(default)]
    pub credentials: HashMap<String, SiteCredentialsConfig>,
}

fn default_token_ttl_secs() -> u64 {
    1_800
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_read_timeout_ms() -> u64 {
    30_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteCredentialsConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct DirectoryConfig {
    /// Base URL of the directory agency API.
    pub base_url: String,
    /// Shared secret the directory verifies assertions against.
    pub secret: String,
    /// Key id named in the assertion header.
    pub key_id: String,
    /// Audience the directory expects.
    pub audience: String,
    #[serde(default = "default_assertion_lifetime_secs")]
    pub assertion_lifetime_secs: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_assertion_lifetime_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MicrositesConfig {
    /// Target used when a company code has no mapping.
    pub fallback: MicrositeConfig,
    /// Company-code keyed microsite mappings.
    #[serde(default)]
    pub map: HashMap<String, MicrositeConfig>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MicrositeConfig {
    /// Base URL the redirect is built on.
    pub url: String,
    /// Display name; optional (the fallback has none).
    pub name: Option<String>,
    /// Booking-system site key.
    pub site: String,
    /// Booking-system API site key.
    pub api_site: String,
}

impl AppConfig {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    /// Consistency checks beyond what serde enforces.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("server.port must be > 0".into()));
        }

        let level = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }

        for (name, template) in [
            ("keys.qa_url", &self.keys.qa_url),
            ("keys.stg_url", &self.keys.stg_url),
            ("keys.prod_url", &self.keys.prod_url),
        ] {
            if !template.contains("{kid}") {
                return Err(ConfigError::Invalid(format!(
                    "{name} must contain a {{kid}} placeholder"
                )));
            }
        }

        if self.booking.base_url.is_empty() {
            return Err(ConfigError::Invalid("booking.base_url is required".into()));
        }
        if self.booking.auth_url.is_empty() {
            return Err(ConfigError::Invalid("booking.auth_url is required".into()));
        }
        if self.directory.base_url.is_empty() {
            return Err(ConfigError::Invalid("directory.base_url is required".into()));
        }
        if self.directory.secret.is_empty() {
            return Err(ConfigError::Invalid("directory.secret is required".into()));
        }

        for (label, target) in std::iter::once(("fallback", &self.microsites.fallback))
            .chain(self.microsites.map.iter().map(|(k, v)| (k.as_str(), v)))
        {
            if target.url.is_empty() || target.site.is_empty() || target.api_site.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "microsite '{label}' needs url, site and api_site"
                )));
            }
        }

        Ok(())
    }
}

/// Loads and validates the configuration at `path`.
///
/// # Errors
///
/// Fails when the file cannot be read, parsed, or validated.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = std::fs::read_to_string(path)?;
    let config: AppConfig = toml::from_str(&raw)?;
    config.validate()?;
    Ok(config)
}
