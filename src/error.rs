//! Typed errors for each pipeline stage

use std::path::PathBuf;

/// Failures of the audio extraction stage
#[derive(thiserror::Error, Debug)]
pub enum ExtractionError {
    #[error("Downloader '{program}' could not be started: {source}")]
    ToolUnavailable {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Downloader exited with code {code:?}: {stderr}")]
    DownloaderFailed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("Extraction produced no output at {}", path.display())]
    NoOutput { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures talking to the text-generation service
#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("API key not configured for {0}")]
    MissingApiKey(String),

    #[error("Endpoint not configured for {0}")]
    MissingEndpoint(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Empty response from {0}")]
    EmptyResponse(String),
}

/// Failures of a content generator
#[derive(thiserror::Error, Debug)]
pub enum GenerationError {
    #[error("Text generation credentials are not configured")]
    MissingCredentials,

    #[error("Text generation call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("No JSON array found in model response")]
    NoJsonArray,

    #[error("Model response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Model response has the wrong shape: {0}")]
    Shape(String),

    #[error("No models configured")]
    NoModels,

    #[error("All {attempts} model attempts failed; last error: {last}")]
    Exhausted {
        attempts: usize,
        last: Box<GenerationError>,
    },
}

impl GenerationError {
    /// True when the failure came from the service call rather than from the payload
    pub fn is_call_failure(&self) -> bool {
        match self {
            Self::Llm(_) | Self::MissingCredentials => true,
            Self::Exhausted { last, .. } => last.is_call_failure(),
            _ => false,
        }
    }
}

/// Failures of the advanced-content collaborator
#[derive(thiserror::Error, Debug)]
pub enum AdvancedContentError {
    #[error("Advanced content service not configured")]
    NotConfigured,

    #[error("Advanced content request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Advanced content service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Errors that abort a whole pipeline request
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("Failed to prepare work directory: {0}")]
    Workspace(#[source] std::io::Error),

    #[error("Audio extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Quiz generation failed: {0}")]
    Quiz(#[source] GenerationError),
}
