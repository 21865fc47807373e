//! Clipboard access and the result sink
//!
//! The clipboard is the only data-exchange surface with the desktop: the
//! source text is read from it and the result is written back to it.

use cli_clipboard::{ClipboardContext, ClipboardProvider};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transform::{TransformationOutcome, render_result};

/// Text clipboard
pub trait Clipboard {
    fn read_text(&mut self) -> Result<String>;
    fn write_text(&mut self, text: &str) -> Result<()>;
}

/// The operating system clipboard
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    /// A clipboard that cannot be read yields an empty selection
    fn read_text(&mut self) -> Result<String> {
        match ClipboardContext::new().and_then(|mut ctx| ctx.get_contents()) {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(error = %e, "Error accessing clipboard");
                Ok(String::new())
            }
        }
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        ClipboardContext::new()
            .and_then(|mut ctx| ctx.set_contents(text.to_string()))
            .map_err(|e| Error::ClipboardError(e.to_string()))
    }
}

/// In-process clipboard
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryClipboard {
    text: String,
}

impl MemoryClipboard {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn contents(&self) -> &str {
        &self.text
    }
}

impl Clipboard for MemoryClipboard {
    fn read_text(&mut self) -> Result<String> {
        Ok(self.text.clone())
    }

    fn write_text(&mut self, text: &str) -> Result<()> {
        self.text = text.to_string();
        Ok(())
    }
}

/// Destination of a finished transformation
pub trait ResultSink {
    /// Publish the result and return the text to display
    fn publish(&mut self, outcome: &TransformationOutcome) -> Result<String>;
}

/// Writes results to a clipboard
#[derive(Debug, Default)]
pub struct ClipboardSink<C> {
    clipboard: C,
}

impl<C: Clipboard> ClipboardSink<C> {
    pub fn new(clipboard: C) -> Self {
        Self { clipboard }
    }

    pub fn clipboard(&self) -> &C {
        &self.clipboard
    }
}

impl<C: Clipboard> ResultSink for ClipboardSink<C> {
    fn publish(&mut self, outcome: &TransformationOutcome) -> Result<String> {
        self.clipboard.write_text(&outcome.result.output_text)?;
        debug!(
            chars = outcome.result.output_text.chars().count(),
            "Result copied to clipboard"
        );
        Ok(render_result(&outcome.result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::{LanguageCheck, LanguageLabel};
    use crate::operation::Operation;
    use crate::transform::TransformationResult;

    fn outcome(output: &str) -> TransformationOutcome {
        TransformationOutcome {
            result: TransformationResult {
                operation: Operation::Proofread,
                input_text: "Helo".to_string(),
                output_text: output.to_string(),
            },
            language: LanguageCheck {
                input: LanguageLabel::English,
                output: LanguageLabel::English,
            },
        }
    }

    #[test]
    fn test_memory_clipboard() {
        let mut clipboard = MemoryClipboard::new("selected");
        assert_eq!(clipboard.read_text().unwrap(), "selected");
        clipboard.write_text("replaced").unwrap();
        assert_eq!(clipboard.contents(), "replaced");
    }

    #[test]
    fn test_sink_writes_output_and_renders() {
        let mut sink = ClipboardSink::new(MemoryClipboard::new("Helo"));
        let display = sink.publish(&outcome("Hello")).unwrap();

        assert_eq!(sink.clipboard().contents(), "Hello");
        assert!(display.starts_with("Option: Proofread\n\nHello"));
        assert!(display.ends_with("copied to your clipboard."));
    }
}
