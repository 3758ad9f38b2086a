use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::attachments::{DeletePolicy, UploadPolicy};

const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_ALLOWED_EXTENSIONS: &str = "pdf,jpg,jpeg,png";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub portal_api_url: String,
    pub file_retrieval_url: String,
    pub portal_api_token: Option<String>,
    pub upload_max_bytes: u64,
    pub upload_allowed_extensions: Vec<String>,
    pub delete_policy: DeletePolicy,
    pub http_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let portal_api_url = require_env("PORTAL_API_URL")?
            .trim_end_matches('/')
            .to_string();
        let file_retrieval_url = std::env::var("FILE_RETRIEVAL_URL")
            .unwrap_or_else(|_| format!("{portal_api_url}/archivos/descargar"));

        Ok(Config {
            file_retrieval_url,
            portal_api_token: std::env::var("PORTAL_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            upload_max_bytes: parse_env("UPLOAD_MAX_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            upload_allowed_extensions: parse_extensions(
                &std::env::var("UPLOAD_ALLOWED_EXTENSIONS")
                    .unwrap_or_else(|_| DEFAULT_ALLOWED_EXTENSIONS.to_string()),
            ),
            delete_policy: parse_delete_policy(
                &std::env::var("ATTACHMENT_DELETE_POLICY").unwrap_or_else(|_| "log".to_string()),
            )?,
            http_timeout: Duration::from_secs(parse_env("HTTP_TIMEOUT_SECS", 30)?),
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            portal_api_url,
        })
    }

    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_bytes: self.upload_max_bytes,
            allowed_extensions: self.upload_allowed_extensions.clone(),
        }
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect()
}

fn parse_delete_policy(raw: &str) -> Result<DeletePolicy> {
    match raw.trim().to_lowercase().as_str() {
        "log" | "log_and_continue" | "" => Ok(DeletePolicy::LogAndContinue),
        "fatal" => Ok(DeletePolicy::Fatal),
        other => bail!("ATTACHMENT_DELETE_POLICY must be 'log' or 'fatal', got '{other}'"),
    }
}
