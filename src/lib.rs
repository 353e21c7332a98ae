//! Course Pipeline
//!
//! Turns a video URL into course material: the audio track is downloaded,
//! transcribed by an external worker and summarized into lessons, a summary
//! and quiz questions by a text-generation service.

pub mod advanced;
pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod generation;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod transcription;
pub mod workspace;

// Re-export main types for easy access
pub use crate::api::{build_router, ApiServer, AppState};
pub use crate::audio::{AudioExtractor, ExtractionResult};
pub use crate::config::{Config, ConfigBuilder, LLMConfig};
pub use crate::generation::{OutlineGenerator, QuizGenerator, QuizQuestion, SummaryGenerator};
pub use crate::llm::LLMProvider;
pub use crate::pipeline::{CoursePipeline, CourseResponse, GenerationRequest};
pub use crate::transcription::{Transcriber, TranscriptOutcome};
pub use crate::workspace::RequestWorkspace;
