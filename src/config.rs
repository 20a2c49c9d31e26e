use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use once_cell::sync::Lazy;
use tracing::warn;
use url::Url;

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_dir: PathBuf,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_text_model: String,
    pub gemini_image_model: String,
    pub gemini_safety_settings: String,
    pub gemini_request_timeout_seconds: u64,
    pub looks_output_dir: PathBuf,
}

pub static CONFIG: Lazy<Config> =
    Lazy::new(|| Config::load().expect("Failed to load configuration"));

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_path(name: &str, default: &str) -> PathBuf {
    let value = env_string(name, default);
    let trimmed = value.trim();
    if trimmed.is_empty() {
        PathBuf::from(default)
    } else {
        PathBuf::from(trimmed)
    }
}

fn normalize_gemini_safety_settings(value: String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return "permissive".to_string();
    }

    let lowered = trimmed.to_lowercase();
    match lowered.as_str() {
        "permissive" | "off" | "none" => "permissive".to_string(),
        "standard" => "standard".to_string(),
        _ => {
            warn!(
                "Unknown GEMINI_SAFETY_SETTINGS value '{}'; defaulting to permissive.",
                value
            );
            "permissive".to_string()
        }
    }
}

fn normalize_api_base(value: String) -> Result<String> {
    let trimmed = value.trim().trim_end_matches('/');
    let parsed = Url::parse(trimmed)
        .map_err(|err| anyhow!("GEMINI_API_BASE '{}' is not a valid URL: {}", trimmed, err))?;
    if parsed.scheme() != "https" && parsed.scheme() != "http" {
        return Err(anyhow!(
            "GEMINI_API_BASE must use http or https, got '{}'",
            parsed.scheme()
        ));
    }
    Ok(trimmed.to_string())
}

impl Config {
    pub fn load() -> Result<Self> {
        let gemini_api_base = normalize_api_base(env_string(
            "GEMINI_API_BASE",
            "https://generativelanguage.googleapis.com/v1beta",
        ))?;

        Ok(Config {
            log_level: env_string("LOG_LEVEL", "info").to_lowercase(),
            log_dir: env_path("LOG_DIR", "logs"),
            gemini_api_key: env_string("GEMINI_API_KEY", "").trim().to_string(),
            gemini_api_base,
            gemini_text_model: env_string("GEMINI_TEXT_MODEL", "gemini-2.5-pro"),
            gemini_image_model: env_string("GEMINI_IMAGE_MODEL", "gemini-2.5-flash-image"),
            gemini_safety_settings: normalize_gemini_safety_settings(env_string(
                "GEMINI_SAFETY_SETTINGS",
                "permissive",
            )),
            gemini_request_timeout_seconds: env_u64("GEMINI_REQUEST_TIMEOUT_SECONDS", 120).max(1),
            looks_output_dir: env_path("LOOKS_OUTPUT_DIR", "looks"),
        })
    }
}
