use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Process all video files in the source directory
    Batch {
        /// Directory containing source videos (overrides the configured one)
        #[arg(short, long)]
        source_dir: Option<PathBuf>,

        /// Directory for finished videos (overrides the configured one)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Process a single video file through the full pipeline
    Process {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output video file (defaults to the configured output directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract audio from a video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Transcribe an audio file to a subtitle track
    Transcribe {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Embed a subtitle track into a video file
    Embed {
        /// Input video file
        #[arg(short, long)]
        video: PathBuf,

        /// Subtitle file
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write a default configuration file
    Init {
        /// Where to write the configuration
        #[arg(short, long, default_value = "config.toml")]
        path: PathBuf,
    },
}
