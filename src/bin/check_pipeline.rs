use anyhow::{anyhow, Result};
use clap::{Arg, Command};
use course_pipeline::{AudioExtractor, Config, RequestWorkspace, Transcriber, TranscriptOutcome};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("course_pipeline=info,check_pipeline=info")
        .init();

    let matches = Command::new("check-pipeline")
        .about("Run audio extraction and transcription for one video URL")
        .arg(
            Arg::new("url")
                .value_name("URL")
                .help("Video URL to process")
                .required(true)
        )
        .arg(
            Arg::new("keep")
                .long("keep")
                .help("Keep the work directory for inspection")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    let url = matches
        .get_one::<String>("url")
        .ok_or_else(|| anyhow!("URL is required"))?;

    let config = Config::load()?;
    config.validate()?;
    info!("{}", config.summary());

    let workspace = RequestWorkspace::acquire(config.audio.work_root.as_deref())?;
    info!("🔍 Work directory: {}", workspace.path().display());

    let extractor = AudioExtractor::new(&config.audio);
    let extraction = extractor.extract(url, workspace.path()).await?;
    info!("✅ Extracted \"{}\" to {}", extraction.title, extraction.audio_path.display());

    let transcriber = Transcriber::new(&config.transcription);
    let outcome = transcriber.transcribe(&extraction.audio_path).await;

    if matches.get_flag("keep") {
        info!("📁 Kept {}", workspace.keep().display());
    } else {
        workspace.release();
    }

    match outcome {
        TranscriptOutcome::Transcribed { text } => {
            info!("🎉 Transcription succeeded ({} characters)", text.len());
            println!("{}", text);
            Ok(())
        }
        failed => Err(anyhow!("{}", failed.message())),
    }
}
