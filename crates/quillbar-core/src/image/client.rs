//! Image generation client for Replicate-style prediction APIs
//!
//! A prediction is created with `Prefer: wait`; if it is still running when
//! the request returns, its `urls.get` endpoint is polled until it finishes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use tracing::{debug, info};

use crate::config::{Credentials, ImageConfig};
use crate::error::{Error, Result};

use super::types::{
    ImageJob, ImageOutput, Prediction, PredictionRequest, PredictionStatus, normalize_output,
};

/// Replicate API base URL
const REPLICATE_BASE_URL: &str = "https://api.replicate.com/v1";

/// Anything that can turn an image job into output URLs
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn generate(&self, job: &ImageJob) -> Result<ImageOutput>;
}

/// Image generation client
#[derive(Clone)]
pub struct ImageClient {
    http_client: HttpClient,
    api_token: String,
    base_url: String,
    poll_interval: Duration,
}

impl std::fmt::Debug for ImageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageClient")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

/// Builder for ImageClient
#[derive(Default)]
pub struct ImageClientBuilder {
    config: Option<ImageConfig>,
    api_token: Option<String>,
    base_url: Option<String>,
    poll_interval_ms: Option<u64>,
}

impl ImageClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ImageConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Set the base URL (overrides the configured one)
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = Some(ms);
        self
    }

    pub fn build(self) -> Result<ImageClient> {
        let config = self.config.unwrap_or_default();
        let api_token = self
            .api_token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| Error::MissingCredential("Replicate API token".to_string()))?;

        let http_client = HttpClient::builder().build().map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .or_else(|| Some(config.base_url.clone()).filter(|url| !url.is_empty()))
            .unwrap_or_else(|| REPLICATE_BASE_URL.to_string());

        Ok(ImageClient {
            http_client,
            api_token,
            base_url: base_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(
                self.poll_interval_ms.unwrap_or(config.poll_interval_ms),
            ),
        })
    }
}

impl ImageClient {
    pub fn new(config: ImageConfig, api_token: impl Into<String>) -> Result<Self> {
        ImageClientBuilder::new()
            .config(config)
            .api_token(api_token)
            .build()
    }

    /// Create a client with the token from the environment
    pub fn from_env(config: ImageConfig) -> Result<Self> {
        let token = Credentials::image_token()
            .ok_or_else(|| Error::MissingCredential("Replicate API token".to_string()))?;
        Self::new(config, token)
    }

    pub fn builder() -> ImageClientBuilder {
        ImageClientBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a prediction for the job and return its normalized output
    pub async fn run(&self, job: &ImageJob) -> Result<ImageOutput> {
        let mut prediction = self.create_prediction(job).await?;

        while matches!(
            prediction.status,
            PredictionStatus::Starting | PredictionStatus::Processing
        ) {
            let poll_url = prediction.urls.get.clone().ok_or_else(|| {
                Error::ImageGenerationError("Prediction has no status URL".to_string())
            })?;
            tokio::time::sleep(self.poll_interval).await;
            prediction = self.get_prediction(&poll_url).await?;
        }

        match prediction.status {
            PredictionStatus::Succeeded => {
                let urls = normalize_output(prediction.output);
                info!(
                    job_id = %job.id,
                    prediction = %prediction.id,
                    images = urls.len(),
                    "Prediction succeeded"
                );
                Ok(ImageOutput {
                    job_id: job.id,
                    prompt: job.prompt.clone(),
                    urls,
                })
            }
            PredictionStatus::Failed => Err(Error::ImageGenerationError(format!(
                "Prediction failed: {}",
                describe(&prediction.error)
            ))),
            PredictionStatus::Canceled => Err(Error::ImageGenerationError(
                "Prediction was canceled".to_string(),
            )),
            status => Err(Error::ImageGenerationError(format!(
                "Unexpected prediction status: {:?}",
                status
            ))),
        }
    }

    async fn create_prediction(&self, job: &ImageJob) -> Result<Prediction> {
        let url = format!("{}/models/{}/predictions", self.base_url, job.model);

        debug!(job_id = %job.id, model = %job.model, "Creating prediction");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&PredictionRequest { input: job.input() })
            .send()
            .await
            .map_err(Error::NetworkError)?;

        self.parse_prediction(response).await
    }

    async fn get_prediction(&self, url: &str) -> Result<Prediction> {
        debug!(url = %url, "Polling prediction");

        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        self.parse_prediction(response).await
    }

    async fn parse_prediction(&self, response: reqwest::Response) -> Result<Prediction> {
        let status = response.status();
        if !status.is_success() {
            return self.handle_error_response(status, response).await;
        }

        response
            .json()
            .await
            .map_err(|e| Error::ImageGenerationError(format!("Failed to parse prediction: {}", e)))
    }

    /// Handle error responses from the API
    async fn handle_error_response<T>(
        &self,
        status: reqwest::StatusCode,
        response: reqwest::Response,
    ) -> Result<T> {
        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|json| json.get("detail").and_then(|d| d.as_str()).map(str::to_string))
            .unwrap_or(body);

        match status.as_u16() {
            401 => Err(Error::ImageGenerationError(
                "Unauthorized: Invalid Replicate API token".to_string(),
            )),
            404 => Err(Error::ImageGenerationError(format!("Model not found: {}", detail))),
            422 => Err(Error::ImageGenerationError(format!("Invalid input: {}", detail))),
            429 => Err(Error::ImageGenerationError(format!("Rate limited: {}", detail))),
            500..=599 => Err(Error::ImageGenerationError(format!(
                "Server error ({}): {}",
                status, detail
            ))),
            _ => Err(Error::ImageGenerationError(format!(
                "HTTP error {}: {}",
                status, detail
            ))),
        }
    }
}

#[async_trait]
impl ImageBackend for ImageClient {
    async fn generate(&self, job: &ImageJob) -> Result<ImageOutput> {
        self.run(job).await
    }
}

fn describe(error: &serde_json::Value) -> String {
    match error {
        serde_json::Value::Null => "unknown error".to_string(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
