//! Text transformation orchestrator
//!
//! selection → prompt builder → remote call → language guard → result.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::language::{LanguageCheck, LanguageGuard, LanguageMismatch};
use crate::llm::{CompletionBackend, Message};
use crate::operation::Operation;
use crate::prompt::{QA_SYSTEM_INSTRUCTION, SYSTEM_INSTRUCTION, build_prompt, build_question_prompt};

/// One user action: an operation applied to a text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationRequest {
    pub operation: Operation,
    pub input_text: String,
}

impl TransformationRequest {
    pub fn new(operation: Operation, input_text: impl Into<String>) -> Self {
        Self {
            operation,
            input_text: input_text.into(),
        }
    }
}

/// Output of a transformation, held only long enough to display and copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationResult {
    pub operation: Operation,
    pub input_text: String,
    pub output_text: String,
}

/// A result together with the language labels of its request and response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationOutcome {
    pub result: TransformationResult,
    pub language: LanguageCheck,
}

impl TransformationOutcome {
    pub fn mismatch(&self) -> Option<LanguageMismatch> {
        self.language.mismatch()
    }
}

/// Runs transformations and follow-up questions against a completion backend
pub struct Transformer<'a, B: ?Sized> {
    backend: &'a B,
    guard: &'a LanguageGuard,
    model: &'a str,
}

impl<'a, B: CompletionBackend + ?Sized> Transformer<'a, B> {
    pub fn new(backend: &'a B, guard: &'a LanguageGuard, model: &'a str) -> Self {
        Self {
            backend,
            guard,
            model,
        }
    }

    /// Transform the request's text with one backend call
    pub async fn transform(&self, request: TransformationRequest) -> Result<TransformationOutcome> {
        let input_language = self.guard.detect(&request.input_text);
        let prompt = build_prompt(request.operation, &request.input_text, &input_language);

        debug!(operation = %request.operation, "Sending transformation");
        debug!(prompt = %prompt, "Full prompt");

        let messages = vec![Message::system(SYSTEM_INSTRUCTION), Message::user(prompt)];
        let output_text = self.backend.complete(self.model, messages).await?;

        debug!(output = %output_text, "Received transformation");

        let language = self.guard.check(&request.input_text, &output_text);

        info!(
            operation = %request.operation,
            input_chars = request.input_text.chars().count(),
            output_chars = output_text.chars().count(),
            "Transformation complete"
        );

        Ok(TransformationOutcome {
            result: TransformationResult {
                operation: request.operation,
                input_text: request.input_text,
                output_text,
            },
            language,
        })
    }

    /// Answer a question about a previous result
    pub async fn ask(&self, result: &TransformationResult, question: &str) -> Result<String> {
        if question.trim().is_empty() {
            return Err(Error::MissingInput);
        }

        let prompt = build_question_prompt(&result.input_text, &result.output_text, question);
        let messages = vec![Message::system(QA_SYSTEM_INSTRUCTION), Message::user(prompt)];

        self.backend.complete(self.model, messages).await
    }
}

/// Text shown to the user for a finished transformation
pub fn render_result(result: &TransformationResult) -> String {
    format!(
        "{}\n\nThe processed text has been copied to your clipboard.",
        render_output(result)
    )
}

/// Operation label and output, without the clipboard notice
pub fn render_output(result: &TransformationResult) -> String {
    format!("Option: {}\n\n{}", result.operation, result.output_text)
}
