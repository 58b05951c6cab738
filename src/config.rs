use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::info;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_STORE_BASE_URL: &str = "https://shop.example.com";
const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_EVENT_BATCH_SIZE: usize = 50;
const DEFAULT_EVENT_FLUSH_INTERVAL_SECS: u64 = 5;
const DEFAULT_DEDUP_TTL_MS: u64 = 5000;
const DEFAULT_EVENTS_PAGE_SIZE: u64 = 100;
const DEFAULT_EVENTS_MAX_PAGE_SIZE: u64 = 1000;

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// Absolute base URL used to build product links in feeds
    #[serde(default = "default_store_base_url")]
    #[validate(url)]
    pub store_base_url: String,

    /// Currency assumed for events that omit one
    #[serde(default = "default_currency")]
    #[validate(length(equal = 3))]
    pub default_currency: String,

    /// Ingestion queue: buffer size that triggers an immediate flush
    #[serde(default = "default_event_batch_size")]
    #[validate(range(min = 1, max = 1000))]
    pub event_batch_size: usize,

    /// Ingestion queue: max seconds an unflushed event may wait
    #[serde(default = "default_event_flush_interval_secs")]
    #[validate(range(min = 1, max = 300))]
    pub event_flush_interval_secs: u64,

    /// Dedup guard: suppression window for repeated identical events
    #[serde(default = "default_dedup_ttl_ms")]
    pub dedup_ttl_ms: u64,

    /// Default page size for GET /pixel-events
    #[serde(default = "default_events_page_size")]
    pub events_default_page_size: u64,

    /// Hard cap on page size for GET /pixel-events
    #[serde(default = "default_events_max_page_size")]
    pub events_max_page_size: u64,

    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,

    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,

    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Creates a new configuration (used by tests and embedding callers)
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            store_base_url: default_store_base_url(),
            default_currency: default_currency(),
            event_batch_size: default_event_batch_size(),
            event_flush_interval_secs: default_event_flush_interval_secs(),
            dedup_ttl_ms: default_dedup_ttl_ms(),
            events_default_page_size: default_events_page_size(),
            events_max_page_size: default_events_max_page_size(),
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development") || self.environment.eq_ignore_ascii_case("dev")
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn flush_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.event_flush_interval_secs)
    }

    pub fn dedup_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.dedup_ttl_ms)
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_store_base_url() -> String {
    DEFAULT_STORE_BASE_URL.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_event_batch_size() -> usize {
    DEFAULT_EVENT_BATCH_SIZE
}

fn default_event_flush_interval_secs() -> u64 {
    DEFAULT_EVENT_FLUSH_INTERVAL_SECS
}

fn default_dedup_ttl_ms() -> u64 {
    DEFAULT_DEDUP_TTL_MS
}

fn default_events_page_size() -> u64 {
    DEFAULT_EVENTS_PAGE_SIZE
}

fn default_events_max_page_size() -> u64 {
    DEFAULT_EVENTS_MAX_PAGE_SIZE
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("storefeed_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://storefeed.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.validate()?;

    Ok(app_config)
}
