use std::time::Duration;

use url::Url;

/// Runtime configuration, collected once from the environment at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    /// Origin base URL; cleared requests are reissued against it.
    pub backend_base_url: Url,
    /// Ollama-style generate endpoint shared by both oracles.
    pub oracle_url: String,
    pub oracle_model: String,
    pub advisory_timeout: Duration,
    pub generation_timeout: Duration,
    pub origin_timeout: Duration,
    pub behavior_window_secs: i64,
    /// Path prefixes that skip detection entirely and always forward.
    pub trusted_prefixes: Vec<String>,
}

const DEFAULT_ORACLE_URL: &str = "http://localhost:11434/api/generate";
const DEFAULT_ORACLE_MODEL: &str = "phi3";
const DEFAULT_TRUSTED_PREFIXES: &str = "/static/,/assets/,/favicon.ico";

impl GatewayConfig {
    pub fn from_env() -> Result<Self, String> {
        let mut backend_base_url = std::env::var("BACKEND_BASE_URL")
            .map_err(|_| "BACKEND_BASE_URL must be set".to_string())
            .and_then(|raw| {
                Url::parse(&raw).map_err(|e| format!("BACKEND_BASE_URL is not a valid URL: {e}"))
            })?;
        // A trailing slash makes Url::join treat the last segment as a
        // directory, which is what path forwarding needs.
        if !backend_base_url.path().ends_with('/') {
            backend_base_url.set_path(&format!("{}/", backend_base_url.path()));
        }

        Ok(Self {
            port: env_parsed("PORT", 3000),
            backend_base_url,
            oracle_url: env_or("ORACLE_URL", DEFAULT_ORACLE_URL),
            oracle_model: env_or("ORACLE_MODEL", DEFAULT_ORACLE_MODEL),
            advisory_timeout: Duration::from_secs(env_parsed("ADVISORY_TIMEOUT_SECS", 30)),
            generation_timeout: Duration::from_secs(env_parsed("GENERATION_TIMEOUT_SECS", 30)),
            origin_timeout: Duration::from_secs(env_parsed("ORIGIN_TIMEOUT_SECS", 5)),
            behavior_window_secs: env_parsed(
                "BEHAVIOR_WINDOW_SECS",
                luregate_core::behavior::DEFAULT_WINDOW_SECS,
            ),
            trusted_prefixes: std::env::var("TRUSTED_PATH_PREFIXES")
                .unwrap_or_else(|_| DEFAULT_TRUSTED_PREFIXES.to_string())
                .split(',')
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect(),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parsed<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
