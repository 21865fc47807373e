//! Prompt builder
//!
//! Combines the language-preservation preamble with the instruction of the
//! selected operation and the detected input language.

use crate::language::LanguageLabel;
use crate::operation::Operation;

/// Preamble prepended to every operation instruction
pub const BASE_INSTRUCTION: &str = "Process the following text according to the given instructions.
IMPORTANT:
1. Always respond in the EXACT SAME LANGUAGE as the input text.
2. If the input is in Portuguese, use European Portuguese (from Portugal), not Brazilian Portuguese.
3. DO NOT translate the text to any other language.
4. Maintain the original language, dialect, and style of the input text in your response.";

/// System message sent with every transformation request
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant that processes text according to specific instructions. You MUST ALWAYS respond in the EXACT SAME LANGUAGE as the input text. Never translate or change the language.";

/// System message sent with follow-up questions about a result
pub const QA_SYSTEM_INSTRUCTION: &str =
    "You are a helpful assistant analyzing text and answering questions about it.";

const TABLE_INSTRUCTION: &str = "Create a table from the text. Organize the information in a clear, tabular format.
Use markdown-style table formatting. Follow these guidelines:
1. Use '|' to separate columns.
2. Use a row of '---' or ':---:' (for center alignment) or '---:' (for right alignment) to separate the header from the body.
3. Ensure proper alignment of the content for readability.
4. If the table is wide, consider using only essential columns to fit the data.
Example format:
| Header1 | Header2 | Header3 |
|---------|:-------:|--------:|
| Left    | Center  |   Right |
| Data    | Data    |    Data |";

impl Operation {
    /// Operation-specific instruction appended to [`BASE_INSTRUCTION`]
    pub fn instruction(&self) -> &'static str {
        match self {
            Operation::Proofread => {
                "Proofread the text, focusing on grammar, spelling, punctuation, style, and clarity. Return a corrected version."
            }
            Operation::Rewrite => {
                "Rewrite the text, focusing on clarity, style, and coherence. Maintain the original meaning and tone."
            }
            Operation::Friendly => {
                "Rewrite the text to make it friendlier. Focus on a warm, approachable, and conversational tone."
            }
            Operation::Professional => {
                "Rewrite the text to make it more professional. Use formal, respectful language and improve clarity and structure."
            }
            Operation::Concise => {
                "Rewrite the text to make it more concise. Focus on clarity and brevity while maintaining the original meaning."
            }
            Operation::Summary => {
                "Summarize the text, focusing on key points and main ideas. Ensure the summary is clear and concise."
            }
            Operation::KeyPoints => {
                "Extract the key points from the text. Present them in a bulleted or numbered list."
            }
            Operation::Table => TABLE_INSTRUCTION,
            Operation::List => {
                "Transform the text into a list. Break down the information into clear, concise points. Present the list in either bulleted or numbered form."
            }
        }
    }
}

/// Build the user message for a transformation
pub fn build_prompt(operation: Operation, input_text: &str, input_language: &LanguageLabel) -> String {
    format!(
        "{} {}\n\nInput text language: {}\n\n{}",
        BASE_INSTRUCTION,
        operation.instruction(),
        input_language,
        input_text
    )
}

/// Build the user message for a question about a processed text
///
/// Only a summary of the change is sent alongside the processed text, not
/// the original input.
pub fn build_question_prompt(input_text: &str, processed_text: &str, question: &str) -> String {
    let changes_summary = format!(
        "Changes made: The text was transformed from the original version to a processed version. Length changed from {} to {} characters.",
        input_text.chars().count(),
        processed_text.chars().count()
    );

    format!(
        "Context: {}\n\nText to analyze: {}\n\nQuestion: {}\n\nPlease provide a detailed answer about the text, focusing specifically on addressing the question asked.\nRespond in the same language as the text.",
        changes_summary, processed_text, question
    )
}
