//! Quillbar Core Library
//!
//! This crate provides the core functionality for Quillbar, including:
//! - Text operations and prompt construction
//! - Chat-completion integration (OpenAI-compatible API)
//! - Input/output language checking
//! - Clipboard source and result sink
//! - Image generation through a prediction API, run on background workers
//! - The session context tying these together

pub mod clipboard;
pub mod config;
pub mod error;
pub mod image;
pub mod language;
pub mod llm;
pub mod operation;
pub mod prompt;
pub mod session;
pub mod transform;
pub mod worker;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clipboard::{Clipboard, ClipboardSink, ResultSink, SystemClipboard};
    pub use crate::config::{Config, Credentials};
    pub use crate::error::{Error, Result};
    pub use crate::image::{ImageBackend, ImageClient, ImageJob, ImageOutput};
    pub use crate::language::{LanguageGuard, LanguageLabel, LanguageMismatch};
    pub use crate::llm::{CompletionBackend, LlmClient};
    pub use crate::operation::Operation;
    pub use crate::session::{Processed, Session};
    pub use crate::worker::SessionEvent;
}
