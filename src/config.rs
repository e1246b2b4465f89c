//! Configuration module

use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// OpenAI API key (required for the LLM-backed stages)
    pub openai_api_key: String,

    /// Chat model name
    pub openai_model: String,

    /// Override for OpenAI-compatible endpoints
    pub openai_base_url: Option<String>,

    /// NVD API key; the NVD source works unauthenticated at a lower rate
    pub nvd_api_key: Option<String>,

    /// GitHub token; without it the advisory source is omitted
    pub github_token: Option<String>,

    /// OTX API key; without it the pulse source is omitted
    pub otx_api_key: Option<String>,

    /// Per-request HTTP timeout
    pub http_timeout: Duration,

    /// Per-source deadline during a collection run
    pub source_deadline: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),

            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),

            openai_base_url: env::var("OPENAI_BASE_URL").ok(),

            nvd_api_key: env::var("NVD_API_KEY").ok().filter(|k| !k.is_empty()),

            github_token: env::var("GITHUB_TOKEN").ok().filter(|k| !k.is_empty()),

            otx_api_key: env::var("OTX_API_KEY").ok().filter(|k| !k.is_empty()),

            http_timeout: Duration::from_secs(
                env::var("HTTP_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),

            source_deadline: Duration::from_secs(
                env::var("SOURCE_DEADLINE_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}
