use anyhow::Result;
use clap::{Arg, Command};
use course_pipeline::{ApiServer, Config, CoursePipeline};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Command::new("Course Pipeline")
        .version(env!("CARGO_PKG_VERSION"))
        .author("TigreRoll")
        .about("Generate course outlines, summaries and quizzes from video URLs")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Path to a TOML configuration file")
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to listen on (overrides the configuration)")
        )
        .arg(
            Arg::new("dev")
                .long("dev")
                .help("Include error details in HTTP error responses")
                .action(clap::ArgAction::SetTrue)
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
        )
        .get_matches();

    // Initialize logging; RUST_LOG wins over the flag
    let default_filter = if matches.get_flag("verbose") {
        "course_pipeline=debug,tower_http=debug,info"
    } else {
        "course_pipeline=info,tower_http=info,warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .init();

    // Load configuration
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::from_file(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };

    if let Some(port) = matches.get_one::<String>("port") {
        config.server.port = port.parse()?;
    }
    if matches.get_flag("dev") {
        config.server.dev_mode = true;
    }

    config.validate()?;

    info!("🚀 Course Pipeline starting...");
    info!("{}", config.summary());

    let pipeline = Arc::new(CoursePipeline::from_config(&config)?);
    ApiServer::new(pipeline, Arc::new(config)).start().await
}
