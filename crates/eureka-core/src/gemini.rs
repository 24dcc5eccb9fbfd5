use std::time::Duration;

pub use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash-exp:generateContent";

/// How the API key travels with the request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthMode {
    /// `?key=<api key>` on the endpoint URL.
    QueryParam,
    /// `Authorization: Bearer <api key>`.
    Bearer,
}

impl std::str::FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "query" | "key" => Ok(Self::QueryParam),
            "bearer" => Ok(Self::Bearer),
            other => Err(format!("unknown auth mode {other:?} (expected \"query\" or \"bearer\")")),
        }
    }
}

#[derive(Clone)]
pub struct GeminiClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub auth: AuthMode,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl GeminiClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
            auth: AuthMode::QueryParam,
            timeout: Duration::from_secs(60),
            max_error_body_bytes: 8 * 1024,
        }
    }
}

impl std::fmt::Debug for GeminiClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("auth", &self.auth)
            .field("timeout", &self.timeout)
            .field("max_error_body_bytes", &self.max_error_body_bytes)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("response carried no candidate text")]
    MissingCandidate,
}

impl GeminiError {
    /// HTTP status of an upstream rejection, if that is what this error is.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Upstream { status, .. } | Self::UpstreamBody { status, .. } => Some(*status),
            Self::Request(e) => e.status(),
            Self::InvalidJson(_) | Self::MissingCandidate => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}

/// Thin client for the `generateContent` endpoint.
///
/// Exactly one HTTP request per call. There is no retry loop: a failed request is reported
/// to the caller, who decides whether to resubmit.
#[derive(Clone)]
pub struct GeminiClient {
    config: GeminiClientConfig,
    http: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: GeminiClientConfig) -> Result<Self, GeminiError> {
        let http = reqwest::Client::builder()
            .user_agent("eureka-server")
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GeminiClientConfig {
        &self.config
    }

    /// Send `prompt` with the recommender's generation settings and return the first
    /// candidate's text.
    pub async fn generate_text(&self, prompt: &str) -> Result<String, GeminiError> {
        let response = self.generate_content(&GenerateContentRequest::for_prompt(prompt)).await?;
        response.first_text().ok_or(GeminiError::MissingCandidate)
    }

    pub async fn generate_content(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GeminiError> {
        let mut builder = self
            .http
            .post(&self.config.endpoint)
            .timeout(self.config.timeout)
            .json(request);
        builder = match self.config.auth {
            AuthMode::QueryParam => builder.query(&[("key", self.config.api_key.as_str())]),
            AuthMode::Bearer => builder.bearer_auth(&self.config.api_key),
        };

        let resp = builder.send().await?;
        debug!(status = %resp.status(), "gemini responded");
        if !resp.status().is_success() {
            return Err(upstream_error(resp, self.config.max_error_body_bytes).await);
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Classify a non-2xx response. Google's `{"error": {...}}` envelope yields `Upstream`
/// with its message (or status name); anything else keeps the first `limit` bytes of body.
async fn upstream_error(resp: reqwest::Response, limit: usize) -> GeminiError {
    let status = resp.status();
    let body = match resp.bytes().await {
        Ok(bytes) => String::from_utf8_lossy(&bytes[..bytes.len().min(limit)]).into_owned(),
        Err(e) => {
            warn!(error = %e, %status, "could not read gemini error body");
            String::new()
        }
    };
    match serde_json::from_str::<GeminiErrorEnvelope>(&body) {
        Ok(GeminiErrorEnvelope { error }) => GeminiError::Upstream {
            status,
            message: error
                .message
                .or(error.status)
                .unwrap_or_else(|| "unknown upstream error".to_string()),
        },
        Err(_) => GeminiError::UpstreamBody { status, body },
    }
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorObject,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorObject {
    message: Option<String>,
    /// e.g. `RESOURCE_EXHAUSTED`.
    status: Option<String>,
}

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
    pub safety_settings: Vec<SafetySetting>,
}

impl GenerateContentRequest {
    /// Single-turn request: temperature 0.7, top-k 40, top-p 0.95, 8192 output tokens, and
    /// every safety category relaxed to `BLOCK_NONE`.
    pub fn for_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: None,
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.7,
                top_k: 40,
                top_p: 0.95,
                max_output_tokens: 8192,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|category| SafetySetting {
                    category: category.to_string(),
                    threshold: "BLOCK_NONE".to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: String,
    pub threshold: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

impl GenerateContentResponse {
    /// `candidates[0].content.parts[0].text`, if every step of that path exists.
    pub fn first_text(&self) -> Option<String> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .clone()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    pub prompt_token_count: Option<u64>,
    pub candidates_token_count: Option<u64>,
    pub total_token_count: Option<u64>,
}
