use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_SAP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SAP_BATCH_SIZE: usize = 500;
const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 60;
const DEFAULT_STORAGE_ROOT: &str = "storage";
const DEFAULT_COMPANY_NAME: &str = "BFX PACKAGING";
const DEFAULT_PACKING_LIST_REVISION: &str = "F-EMB-07 REV. 02";

/// SAP inventory endpoint settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SapConfig {
    /// Full URL of the inventory snapshot endpoint
    #[serde(default = "default_sap_inventory_url")]
    pub inventory_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_sap_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    /// Rows per insert batch during reconciliation
    #[serde(default = "default_sap_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,
}

impl Default for SapConfig {
    fn default() -> Self {
        Self {
            inventory_url: default_sap_inventory_url(),
            timeout_secs: default_sap_timeout_secs(),
            batch_size: default_sap_batch_size(),
        }
    }
}

/// Document extraction service settings. No URL means extraction is disabled.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_extraction_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_extraction_timeout_secs(),
        }
    }
}

/// Object store settings for uploaded release authorizations
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    #[serde(default = "default_storage_root")]
    pub root: String,

    /// Base URL the stored files are served from
    #[serde(default = "default_storage_public_url")]
    pub public_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            public_url: default_storage_public_url(),
        }
    }
}

/// Static text printed on generated documents
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentsConfig {
    #[serde(default = "default_company_name")]
    pub company_name: String,

    #[serde(default = "default_packing_list_revision")]
    pub packing_list_revision: String,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            company_name: default_company_name(),
            packing_list_revision: default_packing_list_revision(),
        }
    }
}

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
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Per-request timeout applied by the HTTP layer (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    #[serde(default)]
    #[validate]
    pub sap: SapConfig,

    #[serde(default)]
    #[validate]
    pub extraction: ExtractionConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub documents: DocumentsConfig,
}

impl AppConfig {
    /// Creates a configuration with defaults for everything except the essentials
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            sap: SapConfig::default(),
            extraction: ExtractionConfig::default(),
            storage: StorageConfig::default(),
            documents: DocumentsConfig::default(),
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Parsed list of allowed CORS origins, empty when none are configured
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.is_production() && self.cors_origins().is_empty() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some("Set APP__CORS_ALLOWED_ORIGINS in production".into());
            errors.add("cors_allowed_origins", err);
        }

        if let Some(url) = &self.extraction.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                let mut err = ValidationError::new("extraction_base_url");
                err.message = Some("extraction.base_url must be an http(s) URL".into());
                errors.add("extraction", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
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

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_sap_inventory_url() -> String {
    "http://sap-gateway.internal:8000/api/inventario".to_string()
}

fn default_sap_timeout_secs() -> u64 {
    DEFAULT_SAP_TIMEOUT_SECS
}

fn default_sap_batch_size() -> usize {
    DEFAULT_SAP_BATCH_SIZE
}

fn default_extraction_timeout_secs() -> u64 {
    DEFAULT_EXTRACTION_TIMEOUT_SECS
}

fn default_storage_root() -> String {
    DEFAULT_STORAGE_ROOT.to_string()
}

fn default_storage_public_url() -> String {
    "http://localhost:8080/files".to_string()
}

fn default_company_name() -> String {
    DEFAULT_COMPANY_NAME.to_string()
}

fn default_packing_list_revision() -> String {
    DEFAULT_PACKING_LIST_REVISION.to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("bfx_portal={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
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
        .set_default("database_url", "sqlite://bfx_portal.db?mode=rwc")?
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

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn production_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn production_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://portal.example.com, ".into());
        assert!(cfg.validate_additional_constraints().is_ok());
        assert_eq!(cfg.cors_origins(), vec!["https://portal.example.com"]);
    }

    #[test]
    fn extraction_url_must_be_http() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.extraction.base_url = Some("ftp://ai.example.com".into());
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn defaults_match_sync_protocol() {
        let cfg = base_config();
        assert_eq!(cfg.sap.timeout_secs, 30);
        assert_eq!(cfg.sap.batch_size, 500);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let mut cfg = base_config();
        cfg.sap.batch_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_extraction_timeout_is_rejected() {
        let mut cfg = base_config();
        cfg.extraction.timeout_secs = 0;
        assert!(cfg.validate().is_err());
        cfg.extraction.timeout_secs = 1;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn unknown_log_level_is_rejected() {
        let mut cfg = base_config();
        cfg.log_level = "verbose".into();
        assert!(cfg.validate().is_err());
    }
}
