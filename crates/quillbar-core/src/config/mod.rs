//! Configuration management with file persistence

mod credentials;

pub use credentials::{Credentials, IMAGE_TOKEN_ENV};

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Quillbar configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub image: ImageConfig,
    pub language: LanguageConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    /// Request timeout; the HTTP client default applies when unset
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub default_model: String,
    pub default_aspect_ratio: String,
    pub base_url: String,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Texts with fewer letters than this are labelled from a word list
    pub min_statistical_chars: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            default_model: "black-forest-labs/flux-dev".to_string(),
            default_aspect_ratio: "16:9".to_string(),
            base_url: "https://api.replicate.com/v1".to_string(),
            poll_interval_ms: 1000,
        }
    }
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            min_statistical_chars: 12,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("QUILLBAR_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("quillbar")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or the defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        self.validate()?;

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("llm.model must not be empty"));
        }
        if self.image.poll_interval_ms == 0 {
            return Err(anyhow!("image.poll_interval_ms must be greater than zero"));
        }
        validate_aspect_ratio(&self.image.default_aspect_ratio)?;
        Ok(())
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            "llm.model" => Ok(self.llm.model.clone()),
            "llm.base_url" => Ok(self.llm.base_url.clone()),
            "llm.timeout_secs" => Ok(self
                .llm
                .timeout_secs
                .map(|secs| secs.to_string())
                .unwrap_or_else(|| "(client default)".to_string())),

            "image.default_model" => Ok(self.image.default_model.clone()),
            "image.default_aspect_ratio" => Ok(self.image.default_aspect_ratio.clone()),
            "image.base_url" => Ok(self.image.base_url.clone()),
            "image.poll_interval_ms" => Ok(self.image.poll_interval_ms.to_string()),

            "language.min_statistical_chars" => {
                Ok(self.language.min_statistical_chars.to_string())
            }

            _ => Err(anyhow!(
                "Unknown configuration key: {}. Use `quillbar config list` to see available keys.",
                key
            )),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            "llm.model" => {
                if value.trim().is_empty() {
                    return Err(anyhow!("Model must not be empty"));
                }
                self.llm.model = value.to_string();
            }
            "llm.base_url" => {
                self.llm.base_url = value.trim_end_matches('/').to_string();
            }
            "llm.timeout_secs" => {
                self.llm.timeout_secs = match value {
                    "" | "none" | "default" => None,
                    secs => Some(
                        secs.parse()
                            .with_context(|| format!("Invalid timeout_secs value: {}", value))?,
                    ),
                };
            }

            "image.default_model" => {
                self.image.default_model = value.to_string();
            }
            "image.default_aspect_ratio" => {
                validate_aspect_ratio(value)?;
                self.image.default_aspect_ratio = value.to_string();
            }
            "image.base_url" => {
                self.image.base_url = value.trim_end_matches('/').to_string();
            }
            "image.poll_interval_ms" => {
                let interval: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid poll_interval_ms value: {}", value))?;
                if interval == 0 {
                    return Err(anyhow!("Poll interval must be greater than zero"));
                }
                self.image.poll_interval_ms = interval;
            }

            "language.min_statistical_chars" => {
                self.language.min_statistical_chars = value.parse().with_context(|| {
                    format!("Invalid min_statistical_chars value: {}", value)
                })?;
            }

            "api_key" | "llm.api_key" => {
                return Err(anyhow!(
                    "The API key is kept in config.json. Use `quillbar key set` instead."
                ));
            }

            _ => {
                return Err(anyhow!(
                    "Unknown configuration key: {}. Use `quillbar config list` to see available keys.",
                    key
                ));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        let keys = [
            "llm.model",
            "llm.base_url",
            "llm.timeout_secs",
            "image.default_model",
            "image.default_aspect_ratio",
            "image.base_url",
            "image.poll_interval_ms",
            "language.min_statistical_chars",
        ];

        keys.into_iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

/// Aspect ratios look like `16:9`
pub fn validate_aspect_ratio(value: &str) -> anyhow::Result<()> {
    let valid = value
        .split_once(':')
        .map(|(w, h)| w.parse::<u32>().is_ok_and(|w| w > 0) && h.parse::<u32>().is_ok_and(|h| h > 0))
        .unwrap_or(false);

    if valid {
        Ok(())
    } else {
        Err(anyhow!("Invalid aspect ratio '{}'. Use W:H, e.g. 16:9", value))
    }
}
