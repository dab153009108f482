//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: OPEN311_, sections split on `__`,
//!    e.g. `OPEN311_QUERY__MAX_LIMIT=50`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/open311/{service_name}/config.toml
//! 4. System directory: /etc/open311/{service_name}/config.toml
//! 5. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::facade::QueryDefaults;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "OPEN311_";

/// Directory name under XDG and /etc
const CONFIG_DIR: &str = "open311";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Service configuration
    pub service: ServiceConfig,

    /// Middleware configuration
    #[serde(default)]
    pub middleware: MiddlewareConfig,

    /// List/search window defaults
    #[serde(default)]
    pub query: QueryConfig,

    /// Document store connection
    #[serde(default)]
    pub store: StoreConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Service name
    pub name: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl ServiceConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// HTTP middleware configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MiddlewareConfig {
    /// Maximum request body size in megabytes
    #[serde(default = "default_body_limit_mb")]
    pub body_limit_mb: usize,

    /// CORS mode: permissive, restrictive, or disabled
    #[serde(default = "default_cors_mode")]
    pub cors_mode: String,

    /// Request id handling
    #[serde(default)]
    pub request_tracking: RequestTrackingConfig,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            body_limit_mb: default_body_limit_mb(),
            cors_mode: default_cors_mode(),
            request_tracking: RequestTrackingConfig::default(),
        }
    }
}

/// Request tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestTrackingConfig {
    /// Enable request ID generation
    #[serde(default = "default_true")]
    pub request_id_enabled: bool,

    /// Request ID header name
    #[serde(default = "default_request_id_header")]
    pub request_id_header: String,

    /// Copy the request ID onto responses
    #[serde(default = "default_true")]
    pub propagate_headers: bool,

    /// Enable sensitive header masking in logs
    #[serde(default = "default_true")]
    pub mask_sensitive_headers: bool,
}

impl Default for RequestTrackingConfig {
    fn default() -> Self {
        Self {
            request_id_enabled: true,
            request_id_header: default_request_id_header(),
            propagate_headers: true,
            mask_sensitive_headers: true,
        }
    }
}

/// List/search window configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryConfig {
    /// Page size when a request names none
    #[serde(default = "default_limit")]
    pub default_limit: u64,

    /// Largest page size a request may ask for
    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

impl From<QueryConfig> for QueryDefaults {
    fn from(config: QueryConfig) -> Self {
        Self {
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }
}

/// Document store configuration
///
/// Only read when the `surrealdb` feature is enabled; the in-process store
/// needs no connection settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreConfig {
    /// Connection URL (`ws://`, `http://`, or `mem://`)
    #[serde(default = "default_store_url")]
    pub url: String,

    /// Namespace to select
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Database to select
    #[serde(default = "default_database")]
    pub database: String,

    /// Root username (optional)
    #[serde(default)]
    pub username: Option<String>,

    /// Root password (optional)
    #[serde(default)]
    pub password: Option<String>,

    /// Connection attempts after the first failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between connection attempts in seconds (doubles each retry)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: default_store_url(),
            namespace: default_namespace(),
            database: default_database(),
            username: None,
            password: None,
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
        }
    }
}

// Default value functions
fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_true() -> bool {
    true
}

fn default_body_limit_mb() -> usize {
    10
}

fn default_cors_mode() -> String {
    "permissive".to_string()
}

fn default_request_id_header() -> String {
    "x-request-id".to_string()
}

fn default_limit() -> u64 {
    crate::facade::DEFAULT_LIMIT
}

fn default_max_limit() -> u64 {
    crate::facade::MAX_LIMIT
}

fn default_store_url() -> String {
    "mem://".to_string()
}

fn default_namespace() -> String {
    "open311".to_string()
}

fn default_database() -> String {
    "open311".to_string()
}

fn default_max_retries() -> u32 {
    5
}

fn default_retry_delay() -> u64 {
    2
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is taken from the binary name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| "open311-service".to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Self::defaults_for(service_name);

        // Lowest priority first so higher priority files override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        Self::extract(figment.merge(Self::env()))
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the XDG and system directories.
    pub fn load_from(path: &str) -> Result<Self> {
        Self::extract(
            Self::defaults_for("open311-service")
                .merge(Toml::file(path))
                .merge(Self::env()),
        )
    }

    /// Extract and check a configuration from an assembled figment
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Figment seeded with the defaults for `service_name`
    pub fn defaults_for(service_name: &str) -> Figment {
        let mut defaults = Config::default();
        defaults.service.name = service_name.to_string();
        Figment::new().merge(Serialized::defaults(defaults))
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    /// Reject settings the facade cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.query.default_limit == 0 || self.query.max_limit == 0 {
            return Err(crate::error::Error::Config(Box::new(figment::Error::from(
                "query limits must be greater than zero".to_string(),
            ))));
        }
        if self.query.default_limit > self.query.max_limit {
            return Err(crate::error::Error::Config(Box::new(figment::Error::from(
                format!(
                    "query.default_limit ({}) exceeds query.max_limit ({})",
                    self.query.default_limit, self.query.max_limit
                ),
            ))));
        }
        Ok(())
    }

    /// Find all possible config file paths for a service
    ///
    /// Returns paths in priority order (highest first):
    /// 1. Current working directory
    /// 2. XDG config directory
    /// 3. System directory
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_DIR);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(CONFIG_DIR)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }

    /// Window defaults handed to the facade
    pub fn query_defaults(&self) -> QueryDefaults {
        self.query.into()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "open311-service".to_string(),
                port: default_port(),
                log_level: default_log_level(),
                timeout_secs: default_timeout(),
                environment: default_environment(),
            },
            middleware: MiddlewareConfig::default(),
            query: QueryConfig::default(),
            store: StoreConfig::default(),
        }
    }
}
