use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_LLM_BASE_URL: &str = "https://api.deepseek.com/v1";
const DEFAULT_LLM_MODEL: &str = "deepseek-chat";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

/// Application configuration loaded from environment variables.
///
/// Nothing is strictly required at startup: a missing LLM key only fails the
/// requests that need the model.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub data_dir: PathBuf,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub cors_origins: Vec<String>,
    pub static_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8080).context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("projects")),
            llm_api_key: optional_env("LLM_API_KEY").or_else(|| optional_env("DEEPSEEK_API_KEY")),
            llm_base_url: optional_env("LLM_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 120)
                .context("LLM_TIMEOUT_SECS must be a number of seconds")?,
            cors_origins: split_origins(
                &optional_env("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            static_dir: optional_env("STATIC_DIR").map(PathBuf::from),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
        })
    }
}

/// Returns the variable's value, treating unset and blank the same way.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Invalid value for '{key}': {raw}")),
        None => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
