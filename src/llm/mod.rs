pub mod fallback;
pub mod payload;
pub mod providers;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::LLMConfig;
use crate::error::LlmError;

pub use fallback::ModelChain;
pub use payload::extract_json_array;

/// LLM provider types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LLMProvider {
    Gemini,
    OpenAI,
    LMStudio,
}

/// Chat message for LLM communication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// LLM response
#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub content: String,
    pub tokens_used: Option<u32>,
}

/// Trait for LLM providers
///
/// The model is chosen per call so one client can serve a whole model chain.
#[async_trait]
pub trait LLM: Send + Sync {
    async fn chat(&self, model: &str, messages: Vec<ChatMessage>) -> Result<LLMResponse, LlmError>;

    /// Whether the provider has what it needs to authenticate
    fn has_credentials(&self) -> bool;

    fn provider_type(&self) -> LLMProvider;
}

/// Create LLM instance based on configuration
pub fn create_llm(config: &LLMConfig) -> Result<Arc<dyn LLM>, LlmError> {
    match config.provider {
        LLMProvider::Gemini => Ok(Arc::new(providers::GeminiProvider::new(config.clone())?)),
        LLMProvider::OpenAI | LLMProvider::LMStudio => {
            Ok(Arc::new(providers::OpenAICompatibleProvider::new(config.clone())?))
        }
    }
}

/// Cut a transcript down to the prompt budget on a character boundary
pub fn truncate_for_prompt(transcript: &str, max_chars: usize) -> &str {
    match transcript.char_indices().nth(max_chars) {
        Some((idx, _)) => &transcript[..idx],
        None => transcript,
    }
}
