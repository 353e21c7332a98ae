use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use super::diagnostics::{DiagnosticTable, FailureKind};
use crate::config::TranscriptionConfig;

/// Result of one transcription attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranscriptOutcome {
    Transcribed { text: String },
    Failed { kind: FailureKind, detail: String },
}

impl TranscriptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Transcribed { .. })
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Transcribed { text } => Some(text),
            Self::Failed { .. } => None,
        }
    }

    /// Human-readable message for either variant
    pub fn message(&self) -> String {
        match self {
            Self::Transcribed { text } => text.clone(),
            Self::Failed { kind, detail } if detail.is_empty() => kind.describe().to_string(),
            Self::Failed { kind, detail } => format!("{}: {}", kind.describe(), detail),
        }
    }
}

/// Runs the external speech-to-text worker against an audio file
#[derive(Debug, Clone)]
pub struct Transcriber {
    program: String,
    args: Vec<String>,
    base_dir: Option<PathBuf>,
    extra_search_paths: Vec<PathBuf>,
    timeout: Duration,
    diagnostics: DiagnosticTable,
}

impl Transcriber {
    pub fn new(config: &TranscriptionConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            base_dir: config.base_dir.clone(),
            extra_search_paths: config.extra_search_paths.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            diagnostics: DiagnosticTable::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: DiagnosticTable) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Relative audio paths are resolved against the configured base directory
    pub fn resolve_audio_path(&self, audio_path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if audio_path.is_relative() => base.join(audio_path),
            _ => audio_path.to_path_buf(),
        }
    }

    /// PATH for the worker: configured extra directories first, then the inherited PATH
    fn search_path(&self) -> Option<OsString> {
        let inherited = std::env::var_os("PATH");
        let mut paths: Vec<PathBuf> = self.extra_search_paths.clone();
        if let Some(inherited) = &inherited {
            paths.extend(std::env::split_paths(inherited));
        }

        match std::env::join_paths(paths) {
            Ok(joined) => Some(joined),
            Err(e) => {
                warn!("Could not build worker PATH, inheriting the current one: {}", e);
                inherited
            }
        }
    }

    /// Transcribe `audio_path`; never returns an error, failures are a [`TranscriptOutcome::Failed`]
    pub async fn transcribe(&self, audio_path: &Path) -> TranscriptOutcome {
        let audio_path = self.resolve_audio_path(audio_path);
        let start_time = Instant::now();

        info!("🎤 Starting transcription for: {}", audio_path.display());
        info!("⏳ Timeout: {} seconds", self.timeout.as_secs());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&audio_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = self.search_path() {
            cmd.env("PATH", path);
        }
        debug!("Executing command: {:?}", cmd);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                error!("❌ Failed to spawn transcription worker {}: {}", self.program, e);
                return TranscriptOutcome::Failed {
                    kind: FailureKind::SpawnFailed,
                    detail: format!("{}: {}", self.program, e),
                };
            }
        };

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill().await;
            return TranscriptOutcome::Failed {
                kind: FailureKind::SpawnFailed,
                detail: "worker pipes were not available".to_string(),
            };
        };
        let mut stdout_task = tokio::spawn(collect_lines(stdout, Stream::Stdout));
        let mut stderr_task = tokio::spawn(collect_lines(stderr, Stream::Stderr));

        let finished = tokio::time::timeout(self.timeout, async {
            let status = child.wait().await;
            let text = (&mut stdout_task).await.unwrap_or_default();
            let diagnostics = (&mut stderr_task).await.unwrap_or_default();
            (status, text, diagnostics)
        })
        .await;

        let (status, text, diagnostics) = match finished {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "⏰ Transcription timed out after {:.1}s (limit: {}s)",
                    start_time.elapsed().as_secs_f64(),
                    self.timeout.as_secs()
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill transcription worker: {}", e);
                }
                stdout_task.abort();
                stderr_task.abort();
                return TranscriptOutcome::Failed {
                    kind: FailureKind::Timeout,
                    detail: format!("no result after {} seconds", self.timeout.as_secs()),
                };
            }
        };

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                error!("❌ Transcription worker execution failed: {}", e);
                return TranscriptOutcome::Failed {
                    kind: FailureKind::Generic,
                    detail: e.to_string(),
                };
            }
        };

        let elapsed = start_time.elapsed().as_secs_f64();
        if !status.success() {
            let kind = self.diagnostics.classify(&diagnostics);
            error!("❌ Transcription worker failed with {} after {:.1}s ({:?})", status, elapsed, kind);
            let detail = match status.code() {
                Some(code) => format!("exit code {}: {}", code, diagnostics.trim()),
                None => format!("terminated by signal: {}", diagnostics.trim()),
            };
            return TranscriptOutcome::Failed { kind, detail };
        }

        let text = text.trim().to_string();
        if text.is_empty() {
            warn!("⚠️  Transcription worker exited successfully without output");
            return TranscriptOutcome::Failed {
                kind: FailureKind::EmptyOutput,
                detail: diagnostics.trim().to_string(),
            };
        }

        info!("✅ Transcription completed in {:.1}s: {} characters", elapsed, text.len());
        TranscriptOutcome::Transcribed { text }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Accumulate a child stream line by line, logging stderr as it arrives
async fn collect_lines<R: AsyncRead + Unpin>(reader: R, stream: Stream) -> String {
    let mut reader = BufReader::new(reader);
    let mut collected = String::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                if let Stream::Stderr = stream {
                    let trimmed = line.trim();
                    if trimmed.contains('%') || trimmed.contains("progress") {
                        info!("🎙️  Worker: {}", trimmed);
                    } else if !trimmed.is_empty() {
                        debug!("Worker stderr: {}", trimmed);
                    }
                }
                collected.push_str(&line);
            }
            Err(e) => {
                warn!("Error reading worker {:?}: {}", stream, e);
                break;
            }
        }
    }

    collected
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::transcription::diagnostics::DiagnosticRule;
    use tempfile::TempDir;

    fn shell_transcriber(script: &str) -> Transcriber {
        let config = ConfigBuilder::new()
            .with_transcriber("sh", vec!["-c".to_string(), script.to_string()])
            .build();
        Transcriber::new(&config.transcription)
    }

    #[tokio::test]
    async fn test_stdout_becomes_transcript() {
        // The audio path arrives as $0 under `sh -c`
        let transcriber = shell_transcriber(r#"echo "  hello from $0  "; echo 'loading 50%' >&2"#);
        let outcome = transcriber.transcribe(Path::new("/tmp/lesson.mp3")).await;

        assert_eq!(
            outcome,
            TranscriptOutcome::Transcribed {
                text: "hello from /tmp/lesson.mp3".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_empty_output_is_failure() {
        let transcriber = shell_transcriber("printf '   \\n'; exit 0");
        let outcome = transcriber.transcribe(Path::new("audio.mp3")).await;

        assert!(matches!(
            outcome,
            TranscriptOutcome::Failed { kind: FailureKind::EmptyOutput, .. }
        ));
    }

    #[tokio::test]
    async fn test_missing_dependency_is_classified() {
        let transcriber = shell_transcriber(
            r#"echo "ModuleNotFoundError: No module named 'whisper'" >&2; exit 1"#,
        );
        let outcome = transcriber.transcribe(Path::new("audio.mp3")).await;

        match outcome {
            TranscriptOutcome::Failed { kind, detail } => {
                assert_eq!(kind, FailureKind::MissingDependency);
                assert!(detail.contains("exit code 1"));
                assert!(detail.contains("No module named 'whisper'"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_custom_diagnostic_rule_is_used() {
        let mut diagnostics = DiagnosticTable::default();
        diagnostics.push(DiagnosticRule::new(r"(?i)cannot open audio", FailureKind::AudioUnreadable).unwrap());
        let transcriber = shell_transcriber("echo 'Cannot open audio stream' >&2; exit 2").with_diagnostics(diagnostics);

        let outcome = transcriber.transcribe(Path::new("audio.mp3")).await;

        assert!(matches!(
            outcome,
            TranscriptOutcome::Failed { kind: FailureKind::AudioUnreadable, .. }
        ));
    }

    #[tokio::test]
    async fn test_generic_failure_keeps_diagnostics() {
        let transcriber = shell_transcriber("echo 'something odd happened' >&2; exit 3");
        let outcome = transcriber.transcribe(Path::new("audio.mp3")).await;

        assert!(!outcome.is_success());
        assert!(outcome.message().contains("something odd happened"));
        assert!(matches!(outcome, TranscriptOutcome::Failed { kind: FailureKind::Generic, .. }));
    }

    #[tokio::test]
    async fn test_spawn_failure_is_immediate() {
        let config = ConfigBuilder::new()
            .with_transcriber("/nonexistent/interpreter", Vec::new())
            .build();
        let transcriber = Transcriber::new(&config.transcription);

        let start = Instant::now();
        let outcome = transcriber.transcribe(Path::new("audio.mp3")).await;

        assert!(matches!(outcome, TranscriptOutcome::Failed { kind: FailureKind::SpawnFailed, .. }));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_timeout_kills_worker() {
        let temp_dir = TempDir::new().unwrap();
        let pid_file = temp_dir.path().join("worker.pid");
        let script = format!("echo $$ > '{}'; exec sleep 30", pid_file.display());
        let transcriber = shell_transcriber(&script).with_timeout(Duration::from_millis(500));

        let start = Instant::now();
        let outcome = transcriber.transcribe(Path::new("audio.mp3")).await;

        assert!(matches!(outcome, TranscriptOutcome::Failed { kind: FailureKind::Timeout, .. }));
        assert!(start.elapsed() < Duration::from_secs(10));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let still_running = std::process::Command::new("kill")
            .arg("-0")
            .arg(pid.trim())
            .stderr(Stdio::null())
            .status()
            .unwrap()
            .success();
        assert!(!still_running);
    }

    #[tokio::test]
    async fn test_extra_search_paths_prepended() {
        let mut config = ConfigBuilder::new()
            .with_transcriber("sh", vec!["-c".to_string(), "echo \"$PATH\"".to_string()])
            .build();
        config.transcription.extra_search_paths = vec![PathBuf::from("/opt/whisper/bin")];
        let transcriber = Transcriber::new(&config.transcription);

        let outcome = transcriber.transcribe(Path::new("audio.mp3")).await;
        let text = outcome.text().unwrap();
        assert!(text.starts_with("/opt/whisper/bin"));
    }

    #[test]
    fn test_relative_paths_resolve_against_base_dir() {
        let mut config = ConfigBuilder::new().build();
        config.transcription.base_dir = Some(PathBuf::from("/srv/app"));
        let transcriber = Transcriber::new(&config.transcription);

        assert_eq!(
            transcriber.resolve_audio_path(Path::new("temp/audio.mp3")),
            PathBuf::from("/srv/app/temp/audio.mp3")
        );
        assert_eq!(
            transcriber.resolve_audio_path(Path::new("/abs/audio.mp3")),
            PathBuf::from("/abs/audio.mp3")
        );
    }
}
