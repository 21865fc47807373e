//! API key record persisted as `config.json`

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::Config;

/// Environment variable holding the image-generation token
pub const IMAGE_TOKEN_ENV: &str = "REPLICATE_API_TOKEN";

/// Stored credentials: `{ "api_key": "<string>" }`
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.redacted())
            .finish()
    }
}

impl Credentials {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
        }
    }

    /// Get the credentials file path
    pub fn path() -> anyhow::Result<PathBuf> {
        Ok(Config::config_dir()?.join("config.json"))
    }

    /// Load the stored key; a missing file means no key
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file: {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse credentials file: {}", path.display()))
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
        }

        let contents = serde_json::to_string(self).context("Failed to serialize credentials")?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write credentials file: {}", path.display()))?;
        Ok(())
    }

    /// The key, treating an empty or blank value as absent
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn redacted(&self) -> Option<String> {
        self.api_key().map(redact)
    }

    /// Image-generation token from the process environment
    pub fn image_token() -> Option<String> {
        std::env::var(IMAGE_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
    }
}

fn redact(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 4 {
        "***".to_string()
    } else {
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("***{}", suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_has_no_key() {
        let temp_dir = TempDir::new().unwrap();
        let creds = Credentials::load_from(&temp_dir.path().join("config.json")).unwrap();
        assert!(creds.api_key().is_none());
    }

    #[test]
    fn test_save_writes_expected_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        Credentials::new("sk-test-1234").save_to(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "api_key": "sk-test-1234" }));

        let loaded = Credentials::load_from(&path).unwrap();
        assert_eq!(loaded.api_key(), Some("sk-test-1234"));
    }

    #[test]
    fn test_empty_key_counts_as_absent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "api_key": "" }"#).unwrap();

        let loaded = Credentials::load_from(&path).unwrap();
        assert!(loaded.api_key().is_none());
        assert!(loaded.redacted().is_none());
    }

    #[test]
    fn test_redacted() {
        assert_eq!(Credentials::new("sk-abcdef9876").redacted().unwrap(), "***9876");
        assert_eq!(Credentials::new("abc").redacted().unwrap(), "***");
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", Credentials::new("sk-supersecret9876"));
        assert!(!rendered.contains("sk-supersecret"));
        assert!(rendered.contains("***9876"));
        assert_eq!(
            format!("{:?}", Credentials::default()),
            "Credentials { api_key: None }"
        );
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        assert!(Credentials::load_from(&path).is_err());
    }
}
