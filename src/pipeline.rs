//! Request orchestration: extract, transcribe, then generate course content

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use crate::advanced::AdvancedContentClient;
use crate::audio::AudioExtractor;
use crate::config::Config;
use crate::error::PipelineError;
use crate::generation::summary::EMPTY_TRANSCRIPT_PLACEHOLDER;
use crate::generation::{OutlineGenerator, QuizGenerator, QuizQuestion, SummaryGenerator};
use crate::llm::{create_llm, LLM};
use crate::transcription::{FailureKind, Transcriber, TranscriptOutcome};
use crate::workspace::RequestWorkspace;

/// Summary reported when the advanced service returns none
pub const ADVANCED_SUMMARY_FALLBACK: &str = "Contenido avanzado generado";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    All,
    Content,
    Quiz,
    Exercises,
}

/// Client options for one `/transcribe` call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub url: String,
    #[serde(default)]
    pub generate_advanced_content: bool,
    #[serde(default)]
    pub content_type: ContentType,
    #[serde(default)]
    pub number_of_lessons: Option<u32>,
    #[serde(default)]
    pub selected_language: Option<String>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
    #[serde(default)]
    pub include_examples: bool,
    #[serde(default)]
    pub include_test_cases: bool,
    #[serde(default)]
    pub include_hints: bool,
}

impl GenerationRequest {
    pub fn basic(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            generate_advanced_content: false,
            content_type: ContentType::All,
            number_of_lessons: None,
            selected_language: None,
            difficulty_level: None,
            include_examples: false,
            include_test_cases: false,
            include_hints: false,
        }
    }
}

/// Stages a request moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Extracting,
    Transcribing,
    GeneratingBasic,
    GeneratingAdvanced,
    Responding,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Extracting => "extracting",
            Self::Transcribing => "transcribing",
            Self::GeneratingBasic => "generating_basic",
            Self::GeneratingAdvanced => "generating_advanced",
            Self::Responding => "responding",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// Typed reason attached to a transcription-stage error response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionFailure {
    pub kind: FailureKind,
    pub detail: String,
}

/// Body returned by `/transcribe`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseResponse {
    pub transcription: String,
    pub summary: String,
    pub lessons: Vec<String>,
    pub title: String,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TranscriptionFailure>,
}

impl CourseResponse {
    fn transcription_failed(title: String, outcome: &TranscriptOutcome) -> Self {
        let error = match outcome {
            TranscriptOutcome::Failed { kind, detail } => Some(TranscriptionFailure {
                kind: *kind,
                detail: detail.clone(),
            }),
            TranscriptOutcome::Transcribed { .. } => None,
        };

        Self {
            transcription: outcome.message(),
            summary: String::new(),
            lessons: Vec::new(),
            title,
            status: ResponseStatus::Error,
            advanced: None,
            content_type: None,
            error,
        }
    }
}

pub struct CoursePipeline {
    extractor: AudioExtractor,
    transcriber: Transcriber,
    outline: OutlineGenerator,
    summary: SummaryGenerator,
    quiz: QuizGenerator,
    advanced: AdvancedContentClient,
    work_root: Option<PathBuf>,
}

impl CoursePipeline {
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let llm = create_llm(&config.llm)?;
        Self::with_llm(config, llm)
    }

    /// Build the pipeline around an existing text-generation client
    pub fn with_llm(config: &Config, llm: Arc<dyn LLM>) -> anyhow::Result<Self> {
        Ok(Self {
            extractor: AudioExtractor::new(&config.audio),
            transcriber: Transcriber::new(&config.transcription),
            outline: OutlineGenerator::new(Arc::clone(&llm), &config.llm),
            summary: SummaryGenerator::new(Arc::clone(&llm), &config.llm),
            quiz: QuizGenerator::new(llm, &config.llm),
            advanced: AdvancedContentClient::new(&config.advanced)?,
            work_root: config.audio.work_root.clone(),
        })
    }

    /// Run one request inside its own work directory, removed on every exit path
    pub async fn run(&self, request: &GenerationRequest) -> Result<CourseResponse, PipelineError> {
        let workspace = RequestWorkspace::acquire(self.work_root.as_deref()).map_err(PipelineError::Workspace)?;
        let span = info_span!("course_request", request_id = %workspace.request_id());

        let result = self.run_in(&workspace, request).instrument(span).await;
        workspace.release();
        result
    }

    async fn run_in(
        &self,
        workspace: &RequestWorkspace,
        request: &GenerationRequest,
    ) -> Result<CourseResponse, PipelineError> {
        info!(stage = %PipelineStage::Extracting, "🚀 Processing {}", request.url);
        let extraction = self.extractor.extract(&request.url, workspace.path()).await?;

        info!(stage = %PipelineStage::Transcribing, "Transcribing \"{}\"", extraction.title);
        let outcome = self.transcriber.transcribe(&extraction.audio_path).await;
        workspace.discard(&extraction.audio_path).await;

        let transcript = match outcome {
            TranscriptOutcome::Transcribed { text } => text,
            failed => {
                warn!(stage = %PipelineStage::Responding, "Transcription failed: {}", failed.message());
                return Ok(CourseResponse::transcription_failed(extraction.title, &failed));
            }
        };

        if request.generate_advanced_content {
            info!(stage = %PipelineStage::GeneratingAdvanced, "Requesting advanced content");
            match self.advanced.generate(&transcript, &extraction.title, request).await {
                Ok(advanced) => {
                    info!(stage = %PipelineStage::Responding, "✅ Advanced content ready");
                    return Ok(advanced_response(transcript, extraction.title, advanced, request.content_type));
                }
                Err(e) => warn!("⚠️  Advanced content failed, using basic generation: {}", e),
            }
        }

        info!(stage = %PipelineStage::GeneratingBasic, "Generating outline and summary");
        let (lessons, summary) = if transcript.trim().is_empty() {
            (Vec::new(), EMPTY_TRANSCRIPT_PLACEHOLDER.to_string())
        } else {
            let lessons = self.outline.generate(&transcript, request.number_of_lessons).await;
            let summary = self.summary.generate(&transcript).await.into_text();
            (lessons, summary)
        };

        info!(stage = %PipelineStage::Responding, "✅ Course generated: {} lessons", lessons.len());
        Ok(CourseResponse {
            transcription: transcript,
            summary,
            lessons,
            title: extraction.title,
            status: ResponseStatus::Success,
            advanced: None,
            content_type: None,
            error: None,
        })
    }

    pub async fn generate_quiz(
        &self,
        lesson_title: &str,
        lesson_content: &str,
    ) -> Result<Vec<QuizQuestion>, PipelineError> {
        self.quiz
            .generate(lesson_title, lesson_content)
            .await
            .map_err(PipelineError::Quiz)
    }
}

/// Lift lesson titles and summary out of the advanced payload when present
fn advanced_response(transcript: String, title: String, advanced: Value, content_type: ContentType) -> CourseResponse {
    let lessons = advanced["lessons"]
        .as_array()
        .map(|lessons| {
            lessons
                .iter()
                .filter_map(|lesson| lesson["title"].as_str().or_else(|| lesson.as_str()))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let summary = advanced["summary"]
        .as_str()
        .unwrap_or(ADVANCED_SUMMARY_FALLBACK)
        .to_string();

    CourseResponse {
        transcription: transcript,
        summary,
        lessons,
        title,
        status: ResponseStatus::Success,
        advanced: Some(advanced),
        content_type: Some(content_type),
        error: None,
    }
}
