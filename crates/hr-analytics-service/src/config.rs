//! Service configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use hr_analytics_core::DEFAULT_TABLE_NAME;

/// Default identity provider issuer when `AUTH_ISSUER` is unset.
const DEFAULT_AUTH_ISSUER: &str =
    "https://cognito-idp.us-east-1.amazonaws.com/us-east-1_hranalytics";

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Directory holding table data (default: "/data/hr-analytics").
    pub data_dir: String,

    /// Analytics table name (default: "QueryAnalytics").
    pub table_name: String,

    /// Token issuer; JWKS is fetched from `{issuer}/.well-known/jwks.json`.
    pub auth_issuer: String,

    /// App client IDs accepted in `aud` / `client_id`. Empty accepts any.
    pub auth_client_ids: Vec<String>,

    /// Static JWKS file used instead of fetching from the issuer.
    pub auth_jwks_path: Option<String>,

    /// Service API key for record ingestion.
    pub service_api_key: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Secrets file structure.
#[derive(Debug, Deserialize)]
struct ServiceSecrets {
    service_api_key: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let auth_issuer = std::env::var("AUTH_ISSUER").unwrap_or_else(|_| {
            tracing::warn!(
                issuer = %defaults.auth_issuer,
                "AUTH_ISSUER not set, using default issuer"
            );
            defaults.auth_issuer.clone()
        });

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: std::env::var("DATA_DIR").unwrap_or(defaults.data_dir),
            table_name: std::env::var("ANALYTICS_TABLE").unwrap_or(defaults.table_name),
            auth_issuer: auth_issuer.trim_end_matches('/').to_string(),
            auth_client_ids: std::env::var("AUTH_CLIENT_IDS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            auth_jwks_path: std::env::var("AUTH_JWKS_PATH").ok(),
            service_api_key: load_service_api_key(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.request_timeout_seconds),
        }
    }

    /// Directory of the analytics table: `{data_dir}/{table_name}`.
    #[must_use]
    pub fn table_path(&self) -> PathBuf {
        Path::new(&self.data_dir).join(&self.table_name)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Load the service API key from file or environment.
fn load_service_api_key() -> Option<String> {
    let secret_paths = [".secrets/service.json", "../.secrets/service.json"];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<ServiceSecrets>(path) {
            tracing::info!(path = %path, "Loaded service secrets from file");
            return Some(secrets.service_api_key);
        }
    }

    tracing::debug!("Service secrets file not found, using environment variables");
    std::env::var("SERVICE_API_KEY").ok()
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/hr-analytics".into(),
            table_name: DEFAULT_TABLE_NAME.into(),
            auth_issuer: DEFAULT_AUTH_ISSUER.into(),
            auth_client_ids: Vec::new(),
            auth_jwks_path: None,
            service_api_key: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
