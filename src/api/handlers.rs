//! API request handlers

use serde_json::Value;
use tracing::info;

use super::models::{QuizRequest, QuizResponse, VideoInfoRequest, VideoInfoResponse};
use crate::audio::UNTITLED_VIDEO;
use crate::error::PipelineError;
use crate::pipeline::{CoursePipeline, CourseResponse, GenerationRequest};

/// Handle health check requests
pub fn health_check() -> Value {
    serde_json::json!({
        "status": "healthy",
        "service": "course-pipeline",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    })
}

/// Run the full extraction → transcription → generation pipeline
pub async fn transcribe(
    pipeline: &CoursePipeline,
    request: &GenerationRequest,
) -> Result<CourseResponse, PipelineError> {
    pipeline.run(request).await
}

/// Placeholder metadata; no lookup is made against the video source
pub fn video_info(request: &VideoInfoRequest) -> VideoInfoResponse {
    info!("Video info requested for {}", request.url);
    VideoInfoResponse {
        title: UNTITLED_VIDEO.to_string(),
        duration: "00:00".to_string(),
        transcription: "Transcripción pendiente".to_string(),
    }
}

pub async fn generate_quiz(pipeline: &CoursePipeline, request: &QuizRequest) -> Result<QuizResponse, PipelineError> {
    let questions = pipeline
        .generate_quiz(&request.lesson_title, &request.lesson_content)
        .await?;
    Ok(QuizResponse { questions })
}
