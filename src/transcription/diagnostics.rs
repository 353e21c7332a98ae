//! Classification of transcription worker diagnostics
//!
//! The worker only reports failures through its stderr, so the cause is
//! recovered by matching that text against an ordered rule table.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Why a transcription did not produce text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The worker's own runtime dependency (e.g. a Python module) is missing
    MissingDependency,
    /// An external tool the worker shells out to (ffmpeg) is missing
    MissingTool,
    /// The worker could not read the audio file
    AudioUnreadable,
    /// The worker could not be started at all
    SpawnFailed,
    /// The worker exceeded the wall-clock limit and was killed
    Timeout,
    /// Exit status 0 but nothing on stdout
    EmptyOutput,
    /// Any other non-zero exit
    Generic,
}

impl FailureKind {
    /// Operator-facing explanation of the failure
    pub fn describe(&self) -> &'static str {
        match self {
            Self::MissingDependency => "The transcription worker is missing a required library (is whisper installed?)",
            Self::MissingTool => "ffmpeg is not installed or not on the transcription worker's PATH",
            Self::AudioUnreadable => "The transcription worker could not read the audio file",
            Self::SpawnFailed => "The transcription worker could not be started",
            Self::Timeout => "Transcription timed out",
            Self::EmptyOutput => "The transcription worker produced no output despite a success code",
            Self::Generic => "Transcription failed",
        }
    }
}

/// One pattern → kind rule
#[derive(Debug, Clone)]
pub struct DiagnosticRule {
    pattern: Regex,
    kind: FailureKind,
}

impl DiagnosticRule {
    pub fn new(pattern: &str, kind: FailureKind) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            kind,
        })
    }
}

/// Ordered rule table; the first matching rule decides the kind
#[derive(Debug, Clone)]
pub struct DiagnosticTable {
    rules: Vec<DiagnosticRule>,
}

impl DiagnosticTable {
    pub fn new(rules: Vec<DiagnosticRule>) -> Self {
        Self { rules }
    }

    /// Add a rule after the existing ones
    pub fn push(&mut self, rule: DiagnosticRule) {
        self.rules.push(rule);
    }

    pub fn classify(&self, diagnostics: &str) -> FailureKind {
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(diagnostics))
            .map(|rule| rule.kind)
            .unwrap_or(FailureKind::Generic)
    }
}

impl Default for DiagnosticTable {
    fn default() -> Self {
        let defaults = [
            (r"ModuleNotFoundError|No module named", FailureKind::MissingDependency),
            (r"(?i)ffmpeg[^\n]*(not found|no such file)|No such file or directory: '?ffmpeg", FailureKind::MissingTool),
            (r"(?i)(audio file|input file)[^\n]*(not found|does not exist)|Invalid data found when processing input", FailureKind::AudioUnreadable),
        ];

        let rules = defaults
            .iter()
            .filter_map(|(pattern, kind)| match DiagnosticRule::new(pattern, *kind) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::error!("Invalid built-in diagnostic pattern {}: {}", pattern, e);
                    None
                }
            })
            .collect();

        Self::new(rules)
    }
}
