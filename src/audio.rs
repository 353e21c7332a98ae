use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::AudioConfig;
use crate::error::ExtractionError;

/// Title used when the downloader cannot describe the video
pub const UNTITLED_VIDEO: &str = "Video sin título";

/// Audio file obtained from a video source
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub audio_path: PathBuf,
    pub title: String,
}

/// Turns a video URL into a local audio file using a yt-dlp compatible downloader
#[derive(Debug, Clone)]
pub struct AudioExtractor {
    program: String,
    base_args: Vec<String>,
    ffmpeg_location: Option<PathBuf>,
    audio_format: String,
    output_stem: String,
}

impl AudioExtractor {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            program: config.downloader.clone(),
            base_args: config.downloader_args.clone(),
            ffmpeg_location: config.ffmpeg_location.clone(),
            audio_format: config.audio_format.clone(),
            output_stem: config.output_stem.clone(),
        }
    }

    /// Path the extracted audio lands on inside `work_dir`
    pub fn audio_path(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(format!("{}.{}", self.output_stem, self.audio_format))
    }

    /// Download the audio track of `video_url` into `work_dir`
    ///
    /// The returned file is guaranteed to exist and be non-empty.
    pub async fn extract(&self, video_url: &str, work_dir: &Path) -> Result<ExtractionResult, ExtractionError> {
        tokio::fs::create_dir_all(work_dir).await?;

        let title = self.fetch_title(video_url).await;
        info!("🎬 Extracting audio for \"{}\" from {}", title, video_url);

        let audio_path = self.audio_path(work_dir);
        match tokio::fs::remove_file(&audio_path).await {
            Ok(()) => debug!("Removed stale audio file {}", audio_path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let template = work_dir.join(format!("{}.%(ext)s", self.output_stem));
        let mut cmd = self.command();
        cmd.arg("-x")
            .arg("--audio-format")
            .arg(&self.audio_format)
            .arg("--no-playlist")
            .arg("-o")
            .arg(&template);
        if let Some(ffmpeg) = &self.ffmpeg_location {
            cmd.arg("--ffmpeg-location").arg(ffmpeg);
        }
        cmd.arg(video_url);

        let output = self.run(cmd).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("❌ Downloader failed ({}): {}", output.status, stderr);
            return Err(ExtractionError::DownloaderFailed {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
                stderr,
            });
        }

        let size = match tokio::fs::metadata(&audio_path).await {
            Ok(metadata) => metadata.len(),
            Err(_) => 0,
        };
        if size == 0 {
            warn!("❌ Downloader reported success but {} is missing or empty", audio_path.display());
            return Err(ExtractionError::NoOutput { path: audio_path });
        }

        info!("✅ Audio extracted: {} ({:.1} MB)", audio_path.display(), size as f64 / 1_000_000.0);
        Ok(ExtractionResult { audio_path, title })
    }

    /// Best-effort title lookup; any failure yields [`UNTITLED_VIDEO`]
    pub async fn fetch_title(&self, video_url: &str) -> String {
        let mut cmd = self.command();
        cmd.arg("--dump-json")
            .arg("--no-warnings")
            .arg("--skip-download")
            .arg(video_url);

        let output = match self.run(cmd).await {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                debug!("Metadata lookup exited with {}", output.status);
                return UNTITLED_VIDEO.to_string();
            }
            Err(e) => {
                debug!("Metadata lookup failed: {}", e);
                return UNTITLED_VIDEO.to_string();
            }
        };

        parse_title(&String::from_utf8_lossy(&output.stdout)).unwrap_or_else(|| UNTITLED_VIDEO.to_string())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.base_args);
        cmd
    }

    async fn run(&self, mut cmd: Command) -> Result<Output, ExtractionError> {
        debug!("Executing command: {:?}", cmd);
        cmd.output().await.map_err(|source| ExtractionError::ToolUnavailable {
            program: self.program.clone(),
            source,
        })
    }
}

/// Pull the title out of the downloader's info JSON (first JSON line wins for playlists)
fn parse_title(info_json: &str) -> Option<String> {
    info_json
        .lines()
        .filter(|line| !line.trim().is_empty())
        .find_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
        .and_then(|info| info["title"].as_str().map(|t| t.trim().to_string()))
        .filter(|title| !title.is_empty())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use tempfile::TempDir;

    /// Build an extractor that runs `script` through `sh`
    fn extractor_with_script(dir: &Path, script: &str) -> AudioExtractor {
        let script_path = dir.join("fake-downloader.sh");
        std::fs::write(&script_path, script).unwrap();

        let config = ConfigBuilder::new()
            .with_downloader("sh")
            .with_downloader_args(vec![script_path.to_string_lossy().to_string()])
            .build();
        AudioExtractor::new(&config.audio)
    }

    const WORKING_DOWNLOADER: &str = r#"
if [ "$1" = "--dump-json" ]; then
  echo '{"title": "Intro to Smart Contracts", "duration": 321}'
  exit 0
fi
out=""
while [ $# -gt 0 ]; do
  if [ "$1" = "-o" ]; then out="$2"; shift; fi
  shift
done
target=$(echo "$out" | sed 's/%(ext)s/mp3/')
printf 'ID3fakeaudio' > "$target"
"#;

    #[test]
    fn test_parse_title() {
        assert_eq!(parse_title(r#"{"title":"  Hello  "}"#), Some("Hello".to_string()));
        assert_eq!(parse_title("\n{\"title\":\"First\"}\n{\"title\":\"Second\"}"), Some("First".to_string()));
        assert_eq!(parse_title(r#"{"title":""}"#), None);
        assert_eq!(parse_title("not json"), None);
    }

    #[tokio::test]
    async fn test_successful_extraction() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = extractor_with_script(temp_dir.path(), WORKING_DOWNLOADER);
        let work_dir = temp_dir.path().join("work");

        let result = extractor.extract("https://example.com/watch?v=1", &work_dir).await.unwrap();

        assert_eq!(result.title, "Intro to Smart Contracts");
        assert_eq!(result.audio_path, work_dir.join("audio.mp3"));
        let metadata = std::fs::metadata(&result.audio_path).unwrap();
        assert!(metadata.len() > 0);
    }

    #[tokio::test]
    async fn test_stale_audio_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = extractor_with_script(temp_dir.path(), WORKING_DOWNLOADER);
        let work_dir = temp_dir.path().join("work");
        std::fs::create_dir_all(&work_dir).unwrap();
        std::fs::write(work_dir.join("audio.mp3"), b"stale-bytes-from-a-previous-run").unwrap();

        let result = extractor.extract("https://example.com/v", &work_dir).await.unwrap();
        assert_eq!(std::fs::read(&result.audio_path).unwrap(), b"ID3fakeaudio");
    }

    #[tokio::test]
    async fn test_downloader_failure_carries_stderr() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = extractor_with_script(
            temp_dir.path(),
            "echo 'partial progress'\necho 'ERROR: Unsupported URL: not-a-video' >&2\nexit 1\n",
        );

        let err = extractor.extract("not-a-video", temp_dir.path()).await.unwrap_err();
        match &err {
            ExtractionError::DownloaderFailed { code, stdout, stderr } => {
                assert_eq!(*code, Some(1));
                assert_eq!(stdout, "partial progress");
                assert!(stderr.contains("Unsupported URL"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(err.to_string().contains("ERROR: Unsupported URL: not-a-video"));
    }

    #[tokio::test]
    async fn test_success_without_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = extractor_with_script(temp_dir.path(), "exit 0\n");

        let err = extractor.extract("https://example.com/v", temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::NoOutput { .. }));
    }

    #[tokio::test]
    async fn test_success_with_empty_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = extractor_with_script(
            temp_dir.path(),
            &format!(": > '{}'\n", temp_dir.path().join("audio.mp3").display()),
        );

        let err = extractor.extract("https://example.com/v", temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::NoOutput { .. }));
    }

    #[tokio::test]
    async fn test_title_defaults_when_metadata_fails() {
        let temp_dir = TempDir::new().unwrap();
        let extractor = extractor_with_script(temp_dir.path(), "exit 2\n");

        assert_eq!(extractor.fetch_title("https://example.com/v").await, UNTITLED_VIDEO);
    }

    #[tokio::test]
    async fn test_missing_downloader() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigBuilder::new()
            .with_downloader("/nonexistent/downloader-binary")
            .build();
        let extractor = AudioExtractor::new(&config.audio);

        let err = extractor.extract("https://example.com/v", temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::ToolUnavailable { .. }));
    }
}
