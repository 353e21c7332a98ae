//! API data models

use serde::{Deserialize, Serialize};

use crate::generation::QuizQuestion;

/// Error body for transport-level failures
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    /// `details` is only exposed when the server runs in development mode
    pub fn new(error: impl Into<String>, details: impl Into<String>, dev_mode: bool) -> Self {
        Self {
            error: error.into(),
            details: dev_mode.then(|| details.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VideoInfoRequest {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VideoInfoResponse {
    pub title: String,
    pub duration: String,
    pub transcription: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRequest {
    #[serde(default)]
    pub lesson_title: String,
    #[serde(default)]
    pub lesson_content: String,
}

#[derive(Debug, Serialize)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
}
