//! LLM-backed content generators
//!
//! Each generator exposes a typed `try_generate` returning the failure
//! reason, plus the degraded contract callers rely on: the outline falls back
//! to an empty list, the summary to a placeholder sentence, and the quiz has no
//! fallback at all.

pub mod outline;
pub mod quiz;
pub mod summary;

pub use outline::OutlineGenerator;
pub use quiz::{QuizGenerator, QuizQuestion};
pub use summary::{SummaryFailure, SummaryGenerator, SummaryOutcome};

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted [`LLM`] double shared by the generator tests

    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::error::LlmError;
    use crate::llm::{ChatMessage, LLMProvider, LLMResponse, LLM};

    /// One scripted reply
    pub enum Reply {
        Text(&'static str),
        Fail,
    }

    /// Replays replies in order and records every (model, prompt) it receives
    pub struct ScriptedLlm {
        replies: Mutex<VecDeque<Reply>>,
        pub calls: Mutex<Vec<(String, String)>>,
        credentials: bool,
    }

    impl ScriptedLlm {
        pub fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
                credentials: true,
            }
        }

        pub fn without_credentials() -> Self {
            Self {
                credentials: false,
                ..Self::new(Vec::new())
            }
        }

        pub fn models_called(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect()
        }

        pub fn prompts(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(_, p)| p.clone()).collect()
        }
    }

    #[async_trait]
    impl LLM for ScriptedLlm {
        async fn chat(&self, model: &str, messages: Vec<ChatMessage>) -> Result<LLMResponse, LlmError> {
            let prompt = messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n");
            self.calls.lock().unwrap().push((model.to_string(), prompt));

            match self.replies.lock().unwrap().pop_front() {
                Some(Reply::Text(text)) => Ok(LLMResponse {
                    content: text.to_string(),
                    tokens_used: None,
                }),
                Some(Reply::Fail) | None => Err(LlmError::Api {
                    provider: "scripted".to_string(),
                    status: 503,
                    body: "unavailable".to_string(),
                }),
            }
        }

        fn has_credentials(&self) -> bool {
            self.credentials
        }

        fn provider_type(&self) -> LLMProvider {
            LLMProvider::OpenAI
        }
    }
}
