//! Image generation types
//!
//! Request and response types for the prediction API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::config::ImageConfig;

/// One image generation request; at most one is in flight per session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageJob {
    pub id: Uuid,
    /// Model identifier (e.g., "black-forest-labs/flux-dev")
    pub model: String,
    pub prompt: String,
    /// Width:height, e.g. "16:9"
    pub aspect_ratio: String,
    pub disable_safety_checker: bool,
}

impl ImageJob {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            model: model.into(),
            prompt: prompt.into(),
            aspect_ratio: "16:9".to_string(),
            disable_safety_checker: false,
        }
    }

    /// A job using the configured default model and aspect ratio
    pub fn from_config(config: &ImageConfig, prompt: impl Into<String>) -> Self {
        Self::new(config.default_model.clone(), prompt)
            .with_aspect_ratio(config.default_aspect_ratio.clone())
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_aspect_ratio(mut self, aspect_ratio: impl Into<String>) -> Self {
        self.aspect_ratio = aspect_ratio.into();
        self
    }

    pub fn with_safety_checker_disabled(mut self, disabled: bool) -> Self {
        self.disable_safety_checker = disabled;
        self
    }

    /// Prediction input sent to the API
    pub fn input(&self) -> PredictionInput<'_> {
        PredictionInput {
            prompt: &self.prompt,
            aspect_ratio: &self.aspect_ratio,
            disable_safety_checker: self.disable_safety_checker,
        }
    }
}

/// Result of a finished job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOutput {
    pub job_id: Uuid,
    pub prompt: String,
    /// Image URLs in the order the service returned them
    pub urls: Vec<String>,
}

impl ImageOutput {
    /// The representative image used for preview and download
    pub fn primary(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }
}

#[derive(Debug, Serialize)]
pub struct PredictionInput<'a> {
    pub prompt: &'a str,
    pub aspect_ratio: &'a str,
    pub disable_safety_checker: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct PredictionRequest<'a> {
    pub input: PredictionInput<'a>,
}

/// Lifecycle state of a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PredictionStatus::Succeeded | PredictionStatus::Failed | PredictionStatus::Canceled
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictionUrls {
    pub get: Option<String>,
}

/// Prediction object returned by create and poll requests
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub id: String,
    pub status: PredictionStatus,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub error: Value,
    #[serde(default)]
    pub urls: PredictionUrls,
}

/// Normalize a prediction output into an ordered list of strings
///
/// A sequence keeps its order; any single value becomes a one-element list of
/// its string form; `null` means nothing was produced.
pub fn normalize_output(output: Value) -> Vec<String> {
    match output {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().map(value_to_string).collect(),
        other => vec![value_to_string(other)],
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}
