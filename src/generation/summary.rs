use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::LLMConfig;
use crate::error::GenerationError;
use crate::llm::payload::strip_code_fences;
use crate::llm::{truncate_for_prompt, ChatMessage, LLM};

pub const MISSING_CREDENTIALS_PLACEHOLDER: &str = "Resumen no disponible (API Key no configurada)";
pub const API_ERROR_PLACEHOLDER: &str = "Resumen no disponible (error al contactar el servicio de IA)";
pub const INVALID_RESPONSE_PLACEHOLDER: &str = "Resumen no disponible (respuesta inválida del servicio de IA)";
pub const EMPTY_TRANSCRIPT_PLACEHOLDER: &str = "Resumen no disponible (transcripción vacía)";

/// Why a summary could not be produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryFailure {
    MissingCredentials,
    ApiError,
    InvalidResponse,
}

impl SummaryFailure {
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::MissingCredentials => MISSING_CREDENTIALS_PLACEHOLDER,
            Self::ApiError => API_ERROR_PLACEHOLDER,
            Self::InvalidResponse => INVALID_RESPONSE_PLACEHOLDER,
        }
    }

    fn from_error(error: &GenerationError) -> Self {
        match error {
            GenerationError::MissingCredentials => Self::MissingCredentials,
            e if e.is_call_failure() => Self::ApiError,
            _ => Self::InvalidResponse,
        }
    }
}

/// Generated summary, or the reason it is unavailable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Generated(String),
    Unavailable(SummaryFailure),
}

impl SummaryOutcome {
    pub fn is_generated(&self) -> bool {
        matches!(self, Self::Generated(_))
    }

    /// Summary text; the failure placeholder when unavailable
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(text) => text.as_str(),
            Self::Unavailable(failure) => failure.placeholder(),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Generated(text) => text,
            Self::Unavailable(failure) => failure.placeholder().to_string(),
        }
    }
}

pub struct SummaryGenerator {
    llm: Arc<dyn LLM>,
    model: String,
    max_transcript_chars: usize,
}

impl SummaryGenerator {
    pub fn new(llm: Arc<dyn LLM>, config: &LLMConfig) -> Self {
        Self {
            llm,
            model: config.summary_model.clone(),
            max_transcript_chars: config.max_transcript_chars,
        }
    }

    fn prompt(&self, transcript: &str) -> String {
        format!(
            "Summarize the following video transcript in 3 to 4 sentences of plain prose, \
            written in the same language as the transcript. Do not use lists, headings or Markdown.\n\n\
            Transcript:\n{}",
            truncate_for_prompt(transcript, self.max_transcript_chars)
        )
    }

    /// Single attempt against the summary model
    pub async fn try_generate(&self, transcript: &str) -> Result<String, GenerationError> {
        if !self.llm.has_credentials() {
            return Err(GenerationError::MissingCredentials);
        }

        let response = self
            .llm
            .chat(&self.model, vec![ChatMessage::user(self.prompt(transcript))])
            .await?;

        let summary = strip_code_fences(&response.content).trim();
        if summary.is_empty() {
            return Err(GenerationError::Shape("summary text is empty".to_string()));
        }

        Ok(summary.to_string())
    }

    pub async fn generate(&self, transcript: &str) -> SummaryOutcome {
        match self.try_generate(transcript).await {
            Ok(summary) => {
                info!("📝 Summary generated with {} ({} chars)", self.model, summary.len());
                SummaryOutcome::Generated(summary)
            }
            Err(e) => {
                let failure = SummaryFailure::from_error(&e);
                warn!("⚠️  Summary unavailable ({:?}): {}", failure, e);
                SummaryOutcome::Unavailable(failure)
            }
        }
    }
}
