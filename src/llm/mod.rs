//! Optional LLM text generator for alert/report prose.
//!
//! Treated strictly as an optional side-effect: bounded by a timeout, and
//! never allowed to bypass the accusatory-language validation gate in
//! `engine::validate`. When disabled or unavailable, callers fall back to
//! the deterministic template unconditionally.

use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("llm_disabled")]
    Disabled,
    #[error("llm_timeout")]
    Timeout,
    #[error("llm_unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generates prose for `prompt`. Implementations must respect
    /// `timeout` themselves or rely on the caller's `tokio::time::timeout`
    /// wrapper; either way a slow backend must resolve to
    /// `LlmError::Timeout`, never hang the ingestion path.
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError>;
}

/// The deterministic-only backend used whenever `llm.enabled = false`.
pub struct DisabledLlmClient;

#[async_trait]
impl LlmClient for DisabledLlmClient {
    async fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, LlmError> {
        Err(LlmError::Disabled)
    }
}

/// A generic HTTP backend speaking a minimal "prompt in, text out" JSON
/// contract. The actual provider is opaque to the core, per spec.md §1.
pub struct HttpLlmClient {
    client: reqwest::Client,
    api_base: String,
    model: String,
    api_key: Option<String>,
}

impl HttpLlmClient {
    pub fn new(api_base: String, model: String, api_key: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base,
            model,
            api_key,
        }
    }
}

#[derive(serde::Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    text: String,
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, LlmError> {
        let mut request = self
            .client
            .post(format!("{}/generate", self.api_base))
            .timeout(timeout)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
            });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Unavailable(e.to_string())
            }
        })?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;
        Ok(parsed.text)
    }
}
