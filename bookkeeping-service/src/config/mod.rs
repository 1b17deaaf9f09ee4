//! Configuration module for bookkeeping-service.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

pub use service_core::config::HttpConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: core_config::HttpConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub pdf: PdfConfig,
    pub webhook: WebhookConfig,
    /// Comma-separated usernames granted approve/reject rights.
    pub admin_users: String,
    pub log_level: String,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// `backend` selects "s3" or "local"; local keeps PDFs and receipts on disk
/// for development.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: String,
    pub bucket: String,
    pub local_path: String,
    pub presign_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct PdfConfig {
    /// Headless browser binary; unset falls back to the built-in renderer.
    pub browser_bin: Option<String>,
    pub template_dir: String,
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let server = core_config::HttpConfig::load()?;

        Ok(Self {
            server,
            database: DatabaseConfig {
                url: Secret::new(env::var("BOOKKEEPING_DATABASE_URL").map_err(|_| {
                    AppError::ConfigError(anyhow::anyhow!("BOOKKEEPING_DATABASE_URL is required"))
                })?),
                max_connections: env::var("BOOKKEEPING_DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("BOOKKEEPING_DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(1),
            },
            storage: StorageConfig {
                backend: env::var("BOOKKEEPING_STORAGE_BACKEND")
                    .unwrap_or_else(|_| "local".to_string()),
                bucket: env::var("BOOKKEEPING_STORAGE_BUCKET")
                    .unwrap_or_else(|_| "bookkeeping".to_string()),
                local_path: env::var("BOOKKEEPING_STORAGE_LOCAL_PATH")
                    .unwrap_or_else(|_| "./storage".to_string()),
                presign_ttl_secs: env::var("BOOKKEEPING_PRESIGN_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            },
            pdf: PdfConfig {
                browser_bin: env::var("BOOKKEEPING_PDF_BROWSER_BIN").ok(),
                template_dir: env::var("BOOKKEEPING_PDF_TEMPLATE_DIR")
                    .unwrap_or_else(|_| "./templates".to_string()),
            },
            webhook: WebhookConfig {
                endpoint: env::var("BOOKKEEPING_WEBHOOK_ENDPOINT").ok(),
            },
            admin_users: env::var("ADMIN_USERS").unwrap_or_default(),
            log_level: env::var("BOOKKEEPING_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            service_name: "bookkeeping-service".to_string(),
        })
    }
}
