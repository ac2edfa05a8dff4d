// Media processing seam
//
// Every external transcoding invocation goes through the MediaProcessor
// trait: command construction lives in commands.rs, the ffmpeg/ffprobe
// implementation in processor.rs. Tests substitute fakes for the trait.

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;

pub use commands::{MediaCommand, MediaCommandBuilder};

use crate::config::MediaConfig;

use crate::error::Result;

/// Main trait for media processing operations
#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Extract a mono 16 kHz WAV audio track from the video
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()>;

    /// Burn the rendered subtitle track into the video
    async fn embed_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<()>;

    /// Slow playback by the given factor (1.25 = 20% slower)
    async fn slow_down(&self, video_path: &Path, output_path: &Path, speed_factor: f64)
        -> Result<()>;

    /// Mix looped, volume-reduced background music under the original audio
    async fn mix_background_music(
        &self,
        video_path: &Path,
        music_path: &Path,
        output_path: &Path,
        volume_db: f64,
    ) -> Result<()>;

    /// Append the outro clip to the end of the video
    async fn append_outro(
        &self,
        video_path: &Path,
        outro_path: &Path,
        output_path: &Path,
    ) -> Result<()>;

    /// Video duration in seconds
    async fn probe_duration(&self, video_path: &Path) -> Result<f64>;

    /// Check if the media processor binary is available
    fn check_availability(&self) -> Result<()>;
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (ffmpeg-based)
    pub fn create_processor(config: MediaConfig) -> Box<dyn MediaProcessor> {
        Box::new(processor::FfmpegProcessor::new(config))
    }
}
