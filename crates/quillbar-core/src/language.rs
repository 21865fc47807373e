//! Language guard
//!
//! Labels the natural language of a request and its response and reports
//! when the two differ. The comparison is advisory only: a mismatch never
//! blocks a result.

use std::fmt;

use isolang::Language;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use whatlang::Lang;

use crate::config::LanguageConfig;

/// Common words used to label texts too short for trigram statistics
const ENGLISH_WORDS: &[&str] = &[
    "hello", "hi", "hey", "the", "and", "is", "are", "was", "yes", "thanks", "thank", "you",
    "please", "good", "morning", "evening", "night", "bye", "goodbye", "what", "this", "that",
    "with", "of", "it", "i", "my", "we",
];

const PORTUGUESE_WORDS: &[&str] = &[
    "olá", "ola", "oi", "obrigado", "obrigada", "sim", "não", "nao", "bom", "boa", "dia", "tarde",
    "noite", "adeus", "tchau", "você", "voce", "é", "está", "esta", "são", "isto", "isso", "com",
    "de", "do", "da", "que", "eu", "nós", "por", "favor",
];

/// Human-readable language label compared between request and response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LanguageLabel {
    PortugueseEuropean,
    English,
    /// Any other detected language, by ISO code
    Other(String),
    /// Nothing could be detected
    Unknown,
}

impl LanguageLabel {
    /// Map an ISO 639-1 (or 639-3 when no two-letter code exists) code
    pub fn from_code(code: &str) -> Self {
        match code {
            "pt" => LanguageLabel::PortugueseEuropean,
            "en" => LanguageLabel::English,
            other => LanguageLabel::Other(other.to_string()),
        }
    }
}

impl fmt::Display for LanguageLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageLabel::PortugueseEuropean => write!(f, "Portuguese (European)"),
            LanguageLabel::English => write!(f, "English"),
            LanguageLabel::Other(code) => write!(f, "Other({})", code),
            LanguageLabel::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Advisory raised when a response is not in the language of its request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageMismatch {
    pub input: LanguageLabel,
    pub output: LanguageLabel,
}

impl fmt::Display for LanguageMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The API response is in a different language. Input: {}, Output: {}",
            self.input, self.output
        )
    }
}

/// Labels of a request/response pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageCheck {
    pub input: LanguageLabel,
    pub output: LanguageLabel,
}

impl LanguageCheck {
    pub fn mismatch(&self) -> Option<LanguageMismatch> {
        if self.input == self.output {
            None
        } else {
            Some(LanguageMismatch {
                input: self.input.clone(),
                output: self.output.clone(),
            })
        }
    }
}

/// Heuristic same-language check between two texts
#[derive(Debug, Clone)]
pub struct LanguageGuard {
    min_statistical_chars: usize,
}

impl Default for LanguageGuard {
    fn default() -> Self {
        Self::new(&LanguageConfig::default())
    }
}

impl LanguageGuard {
    pub fn new(config: &LanguageConfig) -> Self {
        Self {
            min_statistical_chars: config.min_statistical_chars,
        }
    }

    /// Detect the language of a single text
    pub fn detect(&self, text: &str) -> LanguageLabel {
        let letters = text.chars().filter(|c| c.is_alphabetic()).count();
        if letters == 0 {
            return LanguageLabel::Unknown;
        }

        if letters < self.min_statistical_chars {
            return detect_by_lexicon(text);
        }

        match whatlang::detect(text) {
            Some(info) => {
                debug!(
                    lang = info.lang().code(),
                    confidence = info.confidence(),
                    reliable = info.is_reliable(),
                    "Detected language"
                );
                LanguageLabel::from_code(&iso_code(info.lang()))
            }
            None => LanguageLabel::Unknown,
        }
    }

    /// Detect both texts independently and compare their labels
    pub fn check(&self, request: &str, response: &str) -> LanguageCheck {
        let check = LanguageCheck {
            input: self.detect(request),
            output: self.detect(response),
        };

        if let Some(mismatch) = check.mismatch() {
            warn!(
                input = %mismatch.input,
                output = %mismatch.output,
                "Language mismatch detected"
            );
        }

        check
    }
}

/// Two-letter code for a detected language, three-letter when none exists
fn iso_code(lang: Lang) -> String {
    let code = lang.code();
    Language::from_639_3(code)
        .and_then(|language| language.to_639_1())
        .unwrap_or(code)
        .to_string()
}

fn detect_by_lexicon(text: &str) -> LanguageLabel {
    let lowered = text.to_lowercase();
    let words = lowered
        .split(|c: char| !c.is_alphabetic())
        .filter(|w| !w.is_empty());

    let mut english = 0usize;
    let mut portuguese = 0usize;
    for word in words {
        if ENGLISH_WORDS.contains(&word) {
            english += 1;
        }
        if PORTUGUESE_WORDS.contains(&word) {
            portuguese += 1;
        }
    }

    match english.cmp(&portuguese) {
        std::cmp::Ordering::Greater => LanguageLabel::English,
        std::cmp::Ordering::Less => LanguageLabel::PortugueseEuropean,
        std::cmp::Ordering::Equal => LanguageLabel::Unknown,
    }
}
