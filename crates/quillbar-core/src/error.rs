//! Error types for Quillbar

use thiserror::Error;

/// Result type alias using Quillbar's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Quillbar error types with helpful messages and suggestions
#[derive(Error, Debug)]
pub enum Error {
    // Input errors (E001-E099)
    #[error("No text selected. Copy some text before choosing an option.")]
    MissingInput,

    #[error("Unknown operation '{0}'. Run `quillbar transform --help` to see all operations.")]
    UnknownOperation(String),

    // Credential errors (E100-E199)
    #[error("{0} is missing. Provide it before using this feature.")]
    MissingCredential(String),

    // Network errors (E200-E299)
    #[error("Network error: {0}. Check your internet connection.")]
    NetworkError(#[from] reqwest::Error),

    #[error("LLM API error: {0}")]
    LlmError(String),

    #[error("Image generation failed: {0}")]
    ImageGenerationError(String),

    #[error("Image download failed: {0}")]
    ImageDownloadError(String),

    #[error("Failed to save image: {0}")]
    ImageSaveError(String),

    // Session errors (E300-E399)
    #[error("No previous prompt available.")]
    NoPreviousPrompt,

    #[error("No image URL available. Generate an image first.")]
    NoImageAvailable,

    #[error("No processed text available. Transform some text first.")]
    NoPreviousResult,

    // Environment errors (E400-E499)
    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingInput => "E001",
            Self::UnknownOperation(_) => "E002",
            Self::MissingCredential(_) => "E100",
            Self::NetworkError(_) => "E200",
            Self::LlmError(_) => "E201",
            Self::ImageGenerationError(_) => "E202",
            Self::ImageDownloadError(_) => "E203",
            Self::ImageSaveError(_) => "E204",
            Self::NoPreviousPrompt => "E300",
            Self::NoImageAvailable => "E301",
            Self::NoPreviousResult => "E302",
            Self::ClipboardError(_) => "E400",
            Self::Io(_) => "E9999",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::MissingCredential(what) if what.contains("Replicate") => {
                Some("export REPLICATE_API_TOKEN=<token>".to_string())
            }
            Self::MissingCredential(_) => Some("quillbar key set".to_string()),
            Self::NetworkError(_) => Some("Check internet connection".to_string()),
            Self::LlmError(_) => Some("quillbar doctor".to_string()),
            Self::UnknownOperation(_) => Some("quillbar transform --help".to_string()),
            Self::NoImageAvailable => Some("quillbar image generate <prompt>".to_string()),
            _ => None,
        }
    }

    /// Title shown above the message on the user-facing surface
    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingInput => "No Text Selected",
            Self::MissingCredential(_) => "API Key Missing",
            _ => "Error",
        }
    }

    /// Whether this error came from the network or a remote API
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::NetworkError(_)
                | Self::LlmError(_)
                | Self::ImageGenerationError(_)
                | Self::ImageDownloadError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_error() {
        let error = Error::MissingInput;
        assert_eq!(error.code(), "E001");
        assert_eq!(error.title(), "No Text Selected");
        assert_eq!(error.suggestion(), None);
        assert!(!error.is_transport());
    }

    #[test]
    fn test_missing_credential_error() {
        let error = Error::MissingCredential("OpenAI API key".to_string());
        assert_eq!(error.code(), "E100");
        assert_eq!(error.title(), "API Key Missing");
        assert_eq!(error.suggestion(), Some("quillbar key set".to_string()));
        assert!(error.to_string().contains("OpenAI API key"));
    }

    #[test]
    fn test_missing_image_token_suggestion() {
        let error = Error::MissingCredential("Replicate API token".to_string());
        assert_eq!(
            error.suggestion(),
            Some("export REPLICATE_API_TOKEN=<token>".to_string())
        );
    }

    #[test]
    fn test_transport_errors() {
        assert!(Error::LlmError("HTTP error 500".to_string()).is_transport());
        assert!(Error::ImageGenerationError("failed".to_string()).is_transport());
        assert!(!Error::NoPreviousPrompt.is_transport());
        assert_eq!(Error::LlmError("x".to_string()).title(), "Error");
    }

    #[test]
    fn test_unknown_operation_error() {
        let error = Error::UnknownOperation("translate".to_string());
        assert_eq!(error.code(), "E002");
        assert!(error.to_string().contains("translate"));
    }

    #[test]
    fn test_session_error_messages() {
        assert_eq!(
            Error::NoImageAvailable.to_string(),
            "No image URL available. Generate an image first."
        );
        assert_eq!(
            Error::NoPreviousPrompt.to_string(),
            "No previous prompt available."
        );
    }
}
