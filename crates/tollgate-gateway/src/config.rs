use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[source] config::ConfigError),

    #[error("config deserialize error: {0}")]
    Deserialize(#[source] config::ConfigError),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

impl ConfigError {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GatewayConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// In-process notification feed
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Development mode: temporary instead of permanent TLS redirects
    #[serde(default)]
    pub dev_mode: bool,
}

impl GatewayConfig {
    /// Parse a TOML document and validate it. No environment overrides.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let cfg: GatewayConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        // Logging validation
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(ConfigError::invalid(format!(
                "logging.level must be one of {valid_levels:?}"
            )));
        }
        if self.notifications.buffer_size == 0 {
            return Err(ConfigError::invalid("notifications.buffer_size must be > 0"));
        }
        if self.proxy.tls_port == 0 {
            return Err(ConfigError::invalid("proxy.tls_port must be > 0"));
        }
        // Certificates and keys come in pairs
        if self.proxy.tls_cert_content.is_empty() != self.proxy.tls_key_content.is_empty() {
            return Err(ConfigError::invalid(
                "proxy.tls_cert_content and proxy.tls_key_content must be set together",
            ));
        }
        if self.admin.tls_cert_content.is_empty() != self.admin.tls_key_content.is_empty() {
            return Err(ConfigError::invalid(
                "admin.tls_cert_content and admin.tls_key_content must be set together",
            ));
        }
        Ok(())
    }
}

/// Configuration cache sizing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum entries per cache. `0` disables caching entirely.
    #[serde(default = "default_cache_size")]
    pub size: usize,
}

fn default_cache_size() -> usize {
    1024
}

impl CacheConfig {
    /// Per-cache capacity, or `None` when caching is disabled.
    pub fn capacity(&self) -> Option<NonZeroUsize> {
        NonZeroUsize::new(self.size)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size: default_cache_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Every server name containing this domain gets the proxy certificate.
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_tls_port")]
    pub tls_port: u16,
    /// Base64-encoded PEM certificate chain
    #[serde(default)]
    pub tls_cert_content: String,
    /// Base64-encoded PEM private key
    #[serde(default)]
    pub tls_key_content: String,
}

fn default_tls_port() -> u16 {
    5443
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            tls_port: default_tls_port(),
            tls_cert_content: String::new(),
            tls_key_content: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub host: String,
    /// Base64-encoded PEM certificate chain
    #[serde(default)]
    pub tls_cert_content: String,
    /// Base64-encoded PEM private key
    #[serde(default)]
    pub tls_key_content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}
fn default_log_level() -> String {
    "info".into()
}
impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Broadcast buffer. A dispatcher that falls further behind than this
    /// resets every cache.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

fn default_buffer_size() -> usize {
    tollgate_core::events::broadcaster::DEFAULT_BUFFER_SIZE
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            buffer_size: default_buffer_size(),
        }
    }
}

pub mod loader {
    use super::{ConfigError, GatewayConfig};
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    pub const DEFAULT_CONFIG_PATH: &str = "tollgate.toml";

    /// Load configuration from `path` (or `tollgate.toml`) if it exists, then
    /// apply `TOLLGATE__SECTION__KEY` environment overrides and validate.
    pub fn load_config(path: Option<&str>) -> Result<GatewayConfig, ConfigError> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., TOLLGATE__CACHE__SIZE=0
        builder = builder.add_source(
            Environment::with_prefix("TOLLGATE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder.build().map_err(ConfigError::Build)?;
        let merged: GatewayConfig = cfg.try_deserialize().map_err(ConfigError::Deserialize)?;
        merged.validate()?;
        Ok(merged)
    }
}
