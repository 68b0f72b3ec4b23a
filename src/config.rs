//! Process configuration, resolved once at startup.
//!
//! Values come from the environment (a `.env` file is loaded first when
//! present). Every option has a default so a bare `cargo run` serves from the
//! working directory.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://certificates.db";
const DEFAULT_STORAGE_DIR: &str = "./generated";
const DEFAULT_UPLOAD_DIR: &str = "./pdf";
const DEFAULT_QA_TIMEOUT_SECS: u64 = 60;
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173,http://127.0.0.1:8080";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be a valid port number, got '{value}'")]
    InvalidPort { name: &'static str, value: String },
    #[error("{name} must be a positive integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("{name} must be true or false, got '{value}'")]
    InvalidBool { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Create the `Applications` table when it is missing.
    pub init_schema: bool,
    /// Directory that receives generated certificates.
    pub storage_root: PathBuf,
    pub letterhead_image: PathBuf,
    /// Directory that receives PDFs uploaded for question answering.
    pub upload_dir: PathBuf,
    pub qa_service_url: Option<String>,
    pub qa_timeout: Duration,
    pub cors_allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match get("PORT") {
            Some(value) => value.parse::<u16>().map_err(|_| ConfigError::InvalidPort {
                name: "PORT",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let init_schema = match get("DATABASE_INIT_SCHEMA") {
            Some(value) => parse_bool("DATABASE_INIT_SCHEMA", value)?,
            None => true,
        };

        let qa_timeout_secs = match get("QA_TIMEOUT_SECS") {
            Some(value) => match value.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        name: "QA_TIMEOUT_SECS",
                        value,
                    })
                }
            },
            None => DEFAULT_QA_TIMEOUT_SECS,
        };

        let cors_allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            init_schema,
            storage_root: get("CERTIFICATE_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR)),
            letterhead_image: get("LETTERHEAD_IMAGE")
                .map(PathBuf::from)
                .unwrap_or_else(default_letterhead),
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            qa_service_url: get("QA_SERVICE_URL").map(|url| url.trim_end_matches('/').to_string()),
            qa_timeout: Duration::from_secs(qa_timeout_secs),
            cors_allowed_origins,
        })
    }
}

fn parse_bool(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool { name, value }),
    }
}

/// Letterhead shipped with the crate.
pub fn default_letterhead() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static/govt.png"))
}
