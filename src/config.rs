use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::llm::LLMProvider;

/// Configuration for the course generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Audio download and extraction settings
    pub audio: AudioConfig,

    /// Transcription worker settings
    pub transcription: TranscriptionConfig,

    /// Text generation settings
    pub llm: LLMConfig,

    /// Advanced content collaborator settings
    pub advanced: AdvancedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Include error chains in 500 responses
    pub dev_mode: bool,

    /// Interval between simulated progress events (milliseconds)
    pub progress_tick_ms: u64,

    /// Percentage added per simulated progress event
    pub progress_step: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Downloader executable (yt-dlp compatible)
    pub downloader: String,

    /// Arguments placed before the downloader's own flags (e.g. `-m yt_dlp`)
    pub downloader_args: Vec<String>,

    /// ffmpeg binary or directory handed to the downloader
    pub ffmpeg_location: Option<PathBuf>,

    /// Audio format requested from the downloader
    pub audio_format: String,

    /// File stem of the extracted audio inside the work directory
    pub output_stem: String,

    /// Parent directory for per-request work directories
    pub work_root: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Worker program (interpreter or binary)
    pub program: String,

    /// Arguments placed before the audio path
    pub args: Vec<String>,

    /// Base directory for resolving relative audio paths
    pub base_dir: Option<PathBuf>,

    /// Directories prepended to PATH for the worker
    pub extra_search_paths: Vec<PathBuf>,

    /// Hard wall-clock limit for one transcription (seconds)
    pub timeout_secs: u64,
}

/// Text generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM provider to use
    pub provider: LLMProvider,

    /// API endpoint (for LMStudio and custom providers)
    pub endpoint: Option<String>,

    /// API key (for cloud providers)
    pub api_key: Option<String>,

    /// Models tried in order for outline generation
    pub outline_models: Vec<String>,

    /// Attempt limit shared across the outline model chain
    pub max_attempts: usize,

    /// Model used for summaries
    pub summary_model: String,

    /// Model used for quizzes
    pub quiz_model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature for generation
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Transcript characters sent in a prompt
    pub max_transcript_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedConfig {
    /// Base URL of the advanced content service; unset disables the advanced path
    pub base_url: Option<String>,

    /// Route on the advanced content service
    pub path: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            dev_mode: false,
            progress_tick_ms: 1000,
            progress_step: 10,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            downloader: "yt-dlp".to_string(),
            downloader_args: Vec::new(),
            ffmpeg_location: None,
            audio_format: "mp3".to_string(),
            output_stem: "audio".to_string(),
            work_root: None,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            args: vec!["scripts/transcribe.py".to_string()],
            base_dir: None,
            extra_search_paths: vec![
                PathBuf::from("/usr/local/bin"),
                PathBuf::from("/opt/homebrew/bin"),
            ],
            timeout_secs: 300, // 5 minutes
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::Gemini,
            endpoint: None,
            api_key: None,
            outline_models: vec![
                "gemini-1.5-pro".to_string(),
                "gemini-1.5-flash".to_string(),
            ],
            max_attempts: 2,
            summary_model: "gemini-1.5-flash".to_string(),
            quiz_model: "gemini-1.5-flash".to_string(),
            max_tokens: 4096,
            temperature: 0.4,
            timeout_seconds: 120,
            max_transcript_chars: 30_000,
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            path: "/api/generate-advanced-content".to_string(),
            timeout_seconds: 600,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            audio: AudioConfig::default(),
            transcription: TranscriptionConfig::default(),
            llm: LLMConfig::default(),
            advanced: AdvancedConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the first readable file, falling back to the environment
    pub fn load() -> Result<Self> {
        let config_paths = [
            "course-pipeline.toml",
            "config/course-pipeline.toml",
            "/etc/course-pipeline/config.toml",
        ];

        for path in &config_paths {
            if Path::new(path).exists() {
                return Self::from_file(Path::new(path));
            }
        }

        Self::from_env()
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path.display(), e))?;
        let mut config: Config = toml::from_str(&config_str)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path.display(), e))?;
        tracing::info!("📄 Loaded configuration from: {}", path.display());

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from environment variables over defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("COURSE_PIPELINE_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid COURSE_PIPELINE_PORT: {}", port),
            }
        }

        if let Ok(dev) = std::env::var("COURSE_PIPELINE_DEV") {
            self.server.dev_mode = dev == "1" || dev.eq_ignore_ascii_case("true");
        }

        if let Ok(downloader) = std::env::var("COURSE_PIPELINE_DOWNLOADER") {
            self.audio.downloader = downloader;
        }

        if let Ok(ffmpeg) = std::env::var("COURSE_PIPELINE_FFMPEG") {
            self.audio.ffmpeg_location = Some(PathBuf::from(ffmpeg));
        }

        if let Ok(work_root) = std::env::var("COURSE_PIPELINE_WORK_ROOT") {
            self.audio.work_root = Some(PathBuf::from(work_root));
        }

        if let Ok(program) = std::env::var("COURSE_PIPELINE_TRANSCRIBER") {
            self.transcription.program = program;
        }

        let key_var = match self.llm.provider {
            LLMProvider::Gemini => "GEMINI_API_KEY",
            LLMProvider::OpenAI | LLMProvider::LMStudio => "OPENAI_API_KEY",
        };
        if let Ok(api_key) = std::env::var("COURSE_PIPELINE_API_KEY").or_else(|_| std::env::var(key_var)) {
            if !api_key.trim().is_empty() {
                self.llm.api_key = Some(api_key);
            }
        }

        if let Ok(base_url) = std::env::var("COURSE_PIPELINE_ADVANCED_URL") {
            self.advanced.base_url = Some(base_url);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("server.port must be greater than 0"));
        }

        if self.server.progress_step == 0 || self.server.progress_step > 100 {
            return Err(anyhow!("server.progress_step must be within 1..=100"));
        }

        if self.audio.downloader.trim().is_empty() {
            return Err(anyhow!("audio.downloader must not be empty"));
        }

        if self.transcription.program.trim().is_empty() {
            return Err(anyhow!("transcription.program must not be empty"));
        }

        if self.transcription.timeout_secs == 0 {
            return Err(anyhow!("transcription.timeout_secs must be greater than 0"));
        }

        if self.llm.outline_models.is_empty() {
            return Err(anyhow!("llm.outline_models must list at least one model"));
        }

        if self.llm.max_attempts == 0 {
            return Err(anyhow!("llm.max_attempts must be greater than 0"));
        }

        if self.llm.provider == LLMProvider::LMStudio && self.llm.endpoint.is_none() {
            return Err(anyhow!("llm.endpoint is required for the LMStudio provider"));
        }

        if self.llm.api_key.is_none() {
            tracing::warn!("⚠️  No text generation API key configured; generators will return placeholders");
        }

        tracing::info!("✅ Configuration validation passed");
        Ok(())
    }

    /// Get runtime configuration summary
    pub fn summary(&self) -> String {
        format!(
            "Course Pipeline Configuration:\n\
            - Listen: {}:{}\n\
            - Downloader: {}\n\
            - Transcriber: {} {}\n\
            - Transcription Timeout: {}s\n\
            - LLM Provider: {:?}\n\
            - Outline Models: {}\n\
            - Advanced Content: {}",
            self.server.host,
            self.server.port,
            self.audio.downloader,
            self.transcription.program,
            self.transcription.args.join(" "),
            self.transcription.timeout_secs,
            self.llm.provider,
            self.llm.outline_models.join(" -> "),
            self.advanced.base_url.as_deref().unwrap_or("disabled"),
        )
    }
}

/// Configuration builder for programmatic config creation
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn with_dev_mode(mut self, dev_mode: bool) -> Self {
        self.config.server.dev_mode = dev_mode;
        self
    }

    pub fn with_progress(mut self, tick_ms: u64, step: u8) -> Self {
        self.config.server.progress_tick_ms = tick_ms;
        self.config.server.progress_step = step;
        self
    }

    pub fn with_downloader(mut self, downloader: impl Into<String>) -> Self {
        self.config.audio.downloader = downloader.into();
        self
    }

    pub fn with_downloader_args(mut self, args: Vec<String>) -> Self {
        self.config.audio.downloader_args = args;
        self
    }

    pub fn with_work_root(mut self, dir: PathBuf) -> Self {
        self.config.audio.work_root = Some(dir);
        self
    }

    pub fn with_transcriber(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.config.transcription.program = program.into();
        self.config.transcription.args = args;
        self
    }

    pub fn with_transcription_timeout(mut self, secs: u64) -> Self {
        self.config.transcription.timeout_secs = secs;
        self
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.config.llm.api_key = api_key;
        self
    }

    pub fn with_outline_models(mut self, models: Vec<String>) -> Self {
        self.config.llm.outline_models = models;
        self
    }

    pub fn with_advanced_url(mut self, base_url: Option<String>) -> Self {
        self.config.advanced.base_url = base_url;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl From<Config> for ConfigBuilder {
    fn from(config: Config) -> Self {
        Self { config }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
