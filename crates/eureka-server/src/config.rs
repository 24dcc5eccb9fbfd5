use std::time::Duration;

use eureka_core::gemini::{AuthMode, GeminiClientConfig};

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
#[derive(Clone)]
pub struct Config {
    pub gemini_api_key: String,
    /// Overrides the default `generateContent` endpoint.
    pub gemini_api_url: Option<String>,
    pub gemini_auth: AuthMode,
    pub gemini_timeout: Option<Duration>,
    /// `None` keeps all state in process memory.
    pub redis_url: Option<String>,
    pub rate_limit_rps: Option<u32>,
    /// Serve MCP over TCP on this address instead of stdio.
    pub tcp_listen_addr: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `GEMINI_API_KEY`
    ///
    /// Optional:
    /// - `GEMINI_API_URL`, `GEMINI_AUTH` (`query` or `bearer`), `GEMINI_TIMEOUT_SECS`
    /// - `REDIS_URL`, `RATE_LIMIT_RPS`, `MCP_TCP_LISTEN_ADDR`
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let gemini_api_key = var("GEMINI_API_KEY").ok_or_else(|| {
            AppError::Config("GEMINI_API_KEY environment variable is required".to_string())
        })?;

        let gemini_auth = match var("GEMINI_AUTH") {
            Some(raw) => raw.parse().map_err(AppError::Config)?,
            None => AuthMode::QueryParam,
        };

        let gemini_timeout = var("GEMINI_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>()
                    .ok()
                    .filter(|&secs| secs > 0)
                    .map(Duration::from_secs)
                    .ok_or_else(|| {
                        AppError::Config(format!("GEMINI_TIMEOUT_SECS must be a positive integer, got {raw:?}"))
                    })
            })
            .transpose()?;

        let rate_limit_rps = var("RATE_LIMIT_RPS")
            .map(|raw| {
                raw.parse::<u32>().map_err(|_| {
                    AppError::Config(format!("RATE_LIMIT_RPS must be an integer, got {raw:?}"))
                })
            })
            .transpose()?;

        Ok(Self {
            gemini_api_key,
            gemini_api_url: var("GEMINI_API_URL"),
            gemini_auth,
            gemini_timeout,
            redis_url: var("REDIS_URL"),
            rate_limit_rps,
            tcp_listen_addr: var("MCP_TCP_LISTEN_ADDR"),
        })
    }

    pub fn gemini(&self) -> GeminiClientConfig {
        let mut config = GeminiClientConfig::new(self.gemini_api_key.clone());
        if let Some(url) = &self.gemini_api_url {
            config.endpoint = url.clone();
        }
        config.auth = self.gemini_auth;
        if let Some(timeout) = self.gemini_timeout {
            config.timeout = timeout;
        }
        config
    }
}
