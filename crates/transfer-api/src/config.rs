//! Service configuration from environment variables.
//!
//! `.env` is loaded by `main` before [`ServiceConfig::from_env`] runs.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `DATABASE_URL` | required |
//! | `HOST` | `0.0.0.0` |
//! | `PORT` | `8080` |
//! | `UPLOAD_DIR` | `./uploads` |
//! | `PUBLIC_DIR` | `./public` |
//! | `SERVICE_HOSTNAME` | `transfer-archives.lib.virginia.edu` |
//! | `DEV_AUTH_USER` | unset |
//! | `AUTH_EMAIL_DOMAIN` | `virginia.edu` |
//! | `MAX_UPLOAD_BYTES` | 512 MiB |
//! | `ALLOWED_ORIGINS` | `http://localhost:8080` |
//! | `DB_MAX_CONNECTIONS` | 10 |
//!
//! SMTP settings are read by [`MailConfig::from_env`].

use std::env;
use std::path::PathBuf;

use axum::http::HeaderValue;
use tracing::warn;

use transfer_core::{Error, Result};
use transfer_db::pool::DEFAULT_MAX_CONNECTIONS;
use transfer_mail::MailConfig;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_UPLOAD_DIR: &str = "./uploads";
pub const DEFAULT_PUBLIC_DIR: &str = "./public";
pub const DEFAULT_HOSTNAME: &str = "transfer-archives.lib.virginia.edu";
pub const DEFAULT_EMAIL_DOMAIN: &str = "virginia.edu";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;
pub const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:8080";

/// Everything the service needs at startup.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    /// Built front end; unknown paths fall back to its `index.html`.
    pub public_dir: PathBuf,
    /// Public hostname used in verification links.
    pub hostname: String,
    /// Computing id that replaces the `remote_user` header in development.
    pub dev_auth_user: Option<String>,
    pub auth_email_domain: String,
    pub max_upload_bytes: usize,
    pub allowed_origins: Vec<String>,
    pub db_max_connections: u32,
    pub mail: MailConfig,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(subsystem = "api", variable = key, value = %raw, "Invalid value; using default");
                default
            }
        },
        _ => default,
    }
}

/// Split a comma-separated origin list, dropping blanks.
pub fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

impl ServiceConfig {
    /// Read the configuration. A missing `DATABASE_URL` is fatal.
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| Error::Config("DATABASE_URL must be set".to_string()))?;

        Ok(Self {
            database_url,
            host: var_or("HOST", DEFAULT_HOST),
            port: parse_var("PORT", DEFAULT_PORT),
            upload_dir: PathBuf::from(var_or("UPLOAD_DIR", DEFAULT_UPLOAD_DIR)),
            public_dir: PathBuf::from(var_or("PUBLIC_DIR", DEFAULT_PUBLIC_DIR)),
            hostname: var_or("SERVICE_HOSTNAME", DEFAULT_HOSTNAME),
            dev_auth_user: env::var("DEV_AUTH_USER")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            auth_email_domain: var_or("AUTH_EMAIL_DOMAIN", DEFAULT_EMAIL_DOMAIN),
            max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            allowed_origins: split_origins(&var_or("ALLOWED_ORIGINS", DEFAULT_ALLOWED_ORIGINS)),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS),
            mail: MailConfig::from_env(),
        })
    }

    /// Configuration for tests and embedding: defaults plus the given database.
    pub fn with_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            public_dir: PathBuf::from(DEFAULT_PUBLIC_DIR),
            hostname: DEFAULT_HOSTNAME.to_string(),
            dev_auth_user: None,
            auth_email_domain: DEFAULT_EMAIL_DOMAIN.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            allowed_origins: split_origins(DEFAULT_ALLOWED_ORIGINS),
            db_max_connections: DEFAULT_MAX_CONNECTIONS,
            mail: MailConfig {
                dev_mode: true,
                ..MailConfig::default()
            },
        }
    }

    /// Origins as header values; unparseable entries are logged and skipped.
    pub fn origin_headers(&self) -> Vec<HeaderValue> {
        self.allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse::<HeaderValue>() {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Invalid CORS origin '{}': {}", origin, e);
                    None
                }
            })
            .collect()
    }

    /// Email address for an authenticated computing id.
    pub fn email_for(&self, computing_id: &str) -> String {
        format!("{}@{}", computing_id, self.auth_email_domain)
    }

    pub fn dev_mode(&self) -> bool {
        self.dev_auth_user.is_some()
    }
}
