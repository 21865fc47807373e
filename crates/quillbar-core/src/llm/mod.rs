//! LLM integration - OpenAI-compatible chat completions
//!
//! This module provides:
//! - HTTP client issuing one chat-completion request per call
//! - Request/response types matching the OpenAI-compatible API
//! - The `CompletionBackend` seam used by the transformer

mod client;
mod types;

pub use client::{CompletionBackend, LlmClient, LlmClientBuilder};
pub use types::{
    ChatRequest, ChatResponse, Choice, FinishReason, LlmResponse, Message, MessageRole,
    ResponseMessage, Usage,
};
