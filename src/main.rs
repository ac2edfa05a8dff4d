//! Kielo - batch bilingual subtitle pipeline
//!
//! Entry point for the kielo application, which turns a directory of raw
//! videos into published ones with burned-in bilingual subtitles using
//! whisper, the Gemini API, and ffmpeg.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kielo::cli::{Args, Commands};
use kielo::config::Config;
use kielo::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Init { path } => {
            config.save_to_file(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        Commands::Batch {
            source_dir,
            output_dir,
        } => {
            if let Some(dir) = source_dir {
                config.batch.source_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.batch.output_dir = dir;
            }
            info!("Processing directory: {}", config.batch.source_dir.display());

            let workflow = Workflow::new(config)?;
            workflow.process_batch().await?;
        }
        Commands::Process { input, output } => {
            info!("Processing video file: {}", input.display());

            let output_path = match output {
                Some(path) => path,
                None => {
                    let file_name = input.file_name().ok_or_else(|| {
                        anyhow::anyhow!("Invalid input filename: {}", input.display())
                    })?;
                    config.batch.output_dir.join(file_name)
                }
            };

            let workflow = Workflow::new(config)?;
            workflow.process_video(&input, &output_path).await?;
        }
        Commands::Extract { input, output } => {
            info!("Extracting audio from: {}", input.display());
            let workflow = Workflow::new(config)?;
            workflow.extract_audio(&input, &output).await?;
        }
        Commands::Transcribe { input, output } => {
            info!("Transcribing audio: {}", input.display());
            let workflow = Workflow::new(config)?;
            workflow.transcribe_audio(&input, &output).await?;
        }
        Commands::Embed {
            video,
            subtitles,
            output,
        } => {
            info!("Embedding subtitles into video: {}", video.display());
            let workflow = Workflow::new(config)?;
            workflow.embed_subtitles(&video, &subtitles, &output).await?;
        }
    }

    info!("Done");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".kielo").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard must outlive main for the writer to flush.
    let file_appender = rolling::daily(&log_dir, "kielo.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
