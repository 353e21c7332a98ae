use std::sync::Arc;
use tracing::{info, warn};

use crate::config::LLMConfig;
use crate::error::GenerationError;
use crate::llm::payload::extract_string_array;
use crate::llm::{truncate_for_prompt, ChatMessage, ModelChain, LLM};

/// Produces an ordered list of lesson titles from a transcript
pub struct OutlineGenerator {
    llm: Arc<dyn LLM>,
    chain: ModelChain,
    max_transcript_chars: usize,
}

impl OutlineGenerator {
    pub fn new(llm: Arc<dyn LLM>, config: &LLMConfig) -> Self {
        Self {
            llm,
            chain: ModelChain::new(config.outline_models.clone(), config.max_attempts),
            max_transcript_chars: config.max_transcript_chars,
        }
    }

    fn prompt(&self, transcript: &str, suggested_lessons: Option<u32>) -> String {
        let count = match suggested_lessons {
            Some(n) if n > 0 => format!("about {} ", n),
            _ => String::new(),
        };

        format!(
            "Based on the following video transcript, propose {count}lesson titles for an online course \
            that teaches its content in a logical order.\n\
            Respond ONLY with a JSON array of strings, for example: [\"Lesson 1 title\", \"Lesson 2 title\"].\n\
            Do not add explanations, numbering or Markdown.\n\n\
            Transcript:\n{}",
            truncate_for_prompt(transcript, self.max_transcript_chars)
        )
    }

    /// Try each model of the chain with the same prompt
    pub async fn try_generate(
        &self,
        transcript: &str,
        suggested_lessons: Option<u32>,
    ) -> Result<Vec<String>, GenerationError> {
        if !self.llm.has_credentials() {
            return Err(GenerationError::MissingCredentials);
        }

        let prompt = self.prompt(transcript, suggested_lessons);
        let llm = &self.llm;

        let (model, lessons) = self
            .chain
            .run(|model| {
                let messages = vec![ChatMessage::user(prompt.clone())];
                async move {
                    let response = llm.chat(&model, messages).await?;
                    extract_string_array(&response.content)
                }
            })
            .await?;

        info!("📚 Outline generated with {}: {} lessons", model, lessons.len());
        Ok(lessons)
    }

    /// Lesson titles, or an empty list when every attempt failed
    pub async fn generate(&self, transcript: &str, suggested_lessons: Option<u32>) -> Vec<String> {
        match self.try_generate(transcript, suggested_lessons).await {
            Ok(lessons) => lessons,
            Err(e) => {
                warn!("⚠️  Outline generation failed, returning no lessons: {}", e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::testing::{Reply, ScriptedLlm};

    fn generator(llm: Arc<ScriptedLlm>) -> OutlineGenerator {
        let config = LLMConfig {
            outline_models: vec!["primary-model".to_string(), "fallback-model".to_string()],
            ..LLMConfig::default()
        };
        OutlineGenerator::new(llm, &config)
    }

    #[tokio::test]
    async fn test_primary_model_success() {
        let llm = Arc::new(ScriptedLlm::new(vec![Reply::Text(
            "```json\n[\"What is a blockchain\", \"Consensus\", \"Smart contracts\"]\n```",
        )]));
        let lessons = generator(Arc::clone(&llm)).generate("transcript text", Some(3)).await;

        assert_eq!(lessons, vec!["What is a blockchain", "Consensus", "Smart contracts"]);
        assert_eq!(llm.models_called(), vec!["primary-model"]);
        assert!(llm.prompts()[0].contains("about 3 lesson titles"));
    }

    #[tokio::test]
    async fn test_both_models_throw_resolves_to_empty() {
        let llm = Arc::new(ScriptedLlm::new(vec![Reply::Fail, Reply::Fail]));
        let lessons = generator(Arc::clone(&llm)).generate("transcript text", None).await;

        assert!(lessons.is_empty());
        assert_eq!(llm.models_called(), vec!["primary-model", "fallback-model"]);
        let prompts = llm.prompts();
        assert_eq!(prompts[0], prompts[1]);
    }

    #[tokio::test]
    async fn test_unparseable_primary_triggers_fallback() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Reply::Text("I think the course should cover wallets and tokens."),
            Reply::Text("Here you go: [\"Wallets\", \"Tokens\"]"),
        ]));
        let lessons = generator(Arc::clone(&llm)).generate("transcript text", None).await;

        assert_eq!(lessons, vec!["Wallets", "Tokens"]);
        assert_eq!(llm.models_called().len(), 2);
    }

    #[tokio::test]
    async fn test_wrong_element_types_count_as_failure() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            Reply::Text("[{\"title\": \"Wallets\"}]"),
            Reply::Text("[1, 2, 3]"),
        ]));
        let generator = generator(Arc::clone(&llm));

        let err = generator.try_generate("transcript", None).await.unwrap_err();
        assert!(matches!(err, GenerationError::Exhausted { attempts: 2, .. }));
        assert!(generator.generate("transcript", None).await.is_empty());
    }

    #[tokio::test]
    async fn test_order_and_duplicates_preserved() {
        let llm = Arc::new(ScriptedLlm::new(vec![Reply::Text("[\"B\", \"A\", \"B\"]")]));
        let lessons = generator(llm).generate("transcript", None).await;
        assert_eq!(lessons, vec!["B", "A", "B"]);
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_the_service() {
        let llm = Arc::new(ScriptedLlm::without_credentials());
        let generator = generator(Arc::clone(&llm));

        assert!(matches!(
            generator.try_generate("transcript", None).await,
            Err(GenerationError::MissingCredentials)
        ));
        assert!(generator.generate("transcript", None).await.is_empty());
        assert!(llm.models_called().is_empty());
    }
}
