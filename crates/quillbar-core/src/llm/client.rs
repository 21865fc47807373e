//! Chat-completion client
//!
//! Issues exactly one request per call. Failures are returned to the caller
//! as-is; re-triggering is left to the user.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::{debug, info};

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatResponse, LlmResponse, Message};

/// OpenAI API base URL
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Anything that can answer a list of messages with a single text
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Return the trimmed text of the first response choice
    async fn complete(&self, model: &str, messages: Vec<Message>) -> Result<String>;
}

/// Chat-completion client
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Builder for creating an LlmClient
#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the base URL (overrides the configured one)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::MissingCredential("OpenAI API key".to_string()))?;

        let mut builder = HttpClient::builder();
        if let Some(secs) = self.timeout_secs.or(config.timeout_secs) {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .or_else(|| Some(config.base_url.clone()).filter(|url| !url.is_empty()))
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());

        Ok(LlmClient {
            http_client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            default_model: config.model,
        })
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        LlmClientBuilder::new()
            .config(config)
            .api_key(api_key)
            .build()
    }

    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a chat completion request
    ///
    /// Sends the messages to `model` (or the configured default) once and
    /// returns the first choice with its content trimmed.
    pub async fn chat(&self, messages: Vec<Message>, model: Option<&str>) -> Result<LlmResponse> {
        let model = model.unwrap_or(&self.default_model);
        let request = ChatRequest::new(model, messages);
        self.send_request(&request).await
    }

    async fn send_request(&self, request: &ChatRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();

        if !status.is_success() {
            return self.handle_error_response(status, response).await;
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::LlmError(format!("Failed to parse response: {}", e)))?;

        let llm_response = LlmResponse::from_chat_response(chat_response)
            .ok_or_else(|| Error::LlmError("Empty response from API".to_string()))?;

        info!(
            model = %llm_response.model,
            tokens = llm_response.tokens_used,
            finish_reason = %llm_response.finish_reason,
            "Chat completion received"
        );

        Ok(llm_response)
    }

    /// Handle error responses from the API
    async fn handle_error_response<T>(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();
        let detail = extract_error_message(&body).unwrap_or(body);

        match status.as_u16() {
            401 => Err(Error::LlmError(
                "Unauthorized: Invalid API key. Update it with `quillbar key set`.".to_string(),
            )),
            429 => Err(Error::LlmError(format!("Rate limited: {}", detail))),
            400 => Err(Error::LlmError(format!("Bad request: {}", detail))),
            404 => Err(Error::LlmError(format!(
                "Model not found or endpoint unavailable: {}",
                detail
            ))),
            500..=599 => Err(Error::LlmError(format!("Server error ({}): {}", status, detail))),
            _ => Err(Error::LlmError(format!("HTTP error {}: {}", status, detail))),
        }
    }
}

#[async_trait]
impl CompletionBackend for LlmClient {
    async fn complete(&self, model: &str, messages: Vec<Message>) -> Result<String> {
        self.chat(messages, Some(model))
            .await
            .map(|response| response.content)
    }
}

/// Pull `error.message` out of an OpenAI-style error body
fn extract_error_message(body: &str) -> Option<String> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("error")
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LlmConfig {
        LlmConfig {
            model: "test/model".to_string(),
            base_url: "https://example.com/v1/".to_string(),
            timeout_secs: None,
        }
    }

    #[test]
    fn test_client_builder() {
        let client = LlmClient::builder()
            .config(test_config())
            .api_key("test-key")
            .base_url("https://override.example.com")
            .timeout_secs(60)
            .build()
            .unwrap();

        assert_eq!(client.default_model(), "test/model");
        assert_eq!(client.base_url(), "https://override.example.com");
    }

    #[test]
    fn test_client_builder_requires_api_key() {
        let result = LlmClient::builder().config(test_config()).build();
        assert!(matches!(result, Err(Error::MissingCredential(_))));

        let blank = LlmClient::builder().config(test_config()).api_key("  ").build();
        assert!(matches!(blank, Err(Error::MissingCredential(_))));
    }

    #[test]
    fn test_client_uses_configured_base_url() {
        let client = LlmClient::new(test_config(), "test-key").unwrap();
        assert_eq!(client.base_url(), "https://example.com/v1");
    }

    #[test]
    fn test_client_debug_hides_key() {
        let client = LlmClient::new(test_config(), "secret-key").unwrap();
        let debug = format!("{:?}", client);
        assert!(debug.contains("LlmClient"));
        assert!(debug.contains("test/model"));
        assert!(!debug.contains("secret-key"));
    }

    #[test]
    fn test_client_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LlmClient>();
    }

    #[test]
    fn test_extract_error_message() {
        let body = r#"{"error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}}"#;
        assert_eq!(
            extract_error_message(body),
            Some("Incorrect API key provided".to_string())
        );
        assert_eq!(extract_error_message("plain text"), None);
    }
}
