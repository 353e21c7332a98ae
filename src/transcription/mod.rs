pub mod diagnostics;
pub mod worker;

pub use diagnostics::{DiagnosticRule, DiagnosticTable, FailureKind};
pub use worker::{Transcriber, TranscriptOutcome};
