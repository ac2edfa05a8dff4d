use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use super::{MediaCommandBuilder, MediaProcessor};
use crate::config::MediaConfig;
use crate::error::{KieloError, Result};

/// ffprobe JSON output shape for duration probing
#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

impl ProbeOutput {
    /// Video stream duration when present, otherwise the container duration.
    fn duration_seconds(&self) -> Option<f64> {
        let stream_duration = self
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .and_then(|s| s.duration.as_deref())
            .and_then(|d| d.parse().ok());

        stream_duration.or_else(|| {
            self.format
                .as_ref()
                .and_then(|f| f.duration.as_deref())
                .and_then(|d| d.parse().ok())
        })
    }
}

/// Concrete media processor (ffmpeg/ffprobe based)
pub struct FfmpegProcessor {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
    probe_builder: MediaCommandBuilder,
}

impl FfmpegProcessor {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);
        let probe_builder = MediaCommandBuilder::new(&config.probe_binary_path);

        Self {
            config,
            command_builder,
            probe_builder,
        }
    }

    fn check_input_exists(&self, path: &Path, what: &str) -> Result<()> {
        if !path.exists() {
            return Err(KieloError::Processing(format!(
                "{} not found: {}",
                what,
                path.display()
            )));
        }
        Ok(())
    }

    /// The external tool reporting success is not enough; the artifact must
    /// exist and be non-empty.
    fn check_output_produced(&self, path: &Path, step: &str) -> Result<()> {
        let metadata = std::fs::metadata(path).map_err(|_| {
            KieloError::Processing(format!(
                "{} reported success but produced no output at {}",
                step,
                path.display()
            ))
        })?;

        if metadata.len() == 0 {
            return Err(KieloError::Processing(format!(
                "{} produced an empty file at {}",
                step,
                path.display()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl MediaProcessor for FfmpegProcessor {
    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        self.check_input_exists(video_path, "Video file")?;

        info!(
            "Extracting audio from {} to {}",
            video_path.display(),
            audio_path.display()
        );

        self.command_builder
            .extract_audio(video_path, audio_path)
            .execute()
            .await?;

        self.check_output_produced(audio_path, "Audio extraction")?;
        info!("Audio extraction completed");
        Ok(())
    }

    async fn embed_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        self.check_input_exists(video_path, "Video file")?;
        self.check_input_exists(subtitle_path, "Subtitle file")?;

        info!(
            "Embedding subtitles from {} into {} -> {}",
            subtitle_path.display(),
            video_path.display(),
            output_path.display()
        );

        self.command_builder
            .embed_subtitles(
                video_path,
                subtitle_path,
                output_path,
                &self.config.subtitle_options,
            )
            .execute()
            .await?;

        self.check_output_produced(output_path, "Subtitle embedding")?;
        info!("Subtitle embedding completed");
        Ok(())
    }

    async fn slow_down(
        &self,
        video_path: &Path,
        output_path: &Path,
        speed_factor: f64,
    ) -> Result<()> {
        self.check_input_exists(video_path, "Video file")?;

        info!(
            "Slowing down {} by factor {}",
            video_path.display(),
            speed_factor
        );

        self.command_builder
            .slow_down(video_path, output_path, speed_factor)
            .execute()
            .await?;

        self.check_output_produced(output_path, "Video slowdown")?;
        Ok(())
    }

    async fn mix_background_music(
        &self,
        video_path: &Path,
        music_path: &Path,
        output_path: &Path,
        volume_db: f64,
    ) -> Result<()> {
        self.check_input_exists(video_path, "Video file")?;
        self.check_input_exists(music_path, "Background music file")?;

        let duration = self.probe_duration(video_path).await?;
        info!(
            "Mixing background music into {} ({}s, {} dB)",
            video_path.display(),
            duration,
            volume_db
        );

        self.command_builder
            .mix_background_music(video_path, music_path, output_path, volume_db, duration)
            .execute()
            .await?;

        self.check_output_produced(output_path, "Background music mix")?;
        Ok(())
    }

    async fn append_outro(
        &self,
        video_path: &Path,
        outro_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        self.check_input_exists(video_path, "Video file")?;
        self.check_input_exists(outro_path, "Outro file")?;

        info!(
            "Appending outro {} to {}",
            outro_path.display(),
            video_path.display()
        );

        self.command_builder
            .append_outro(video_path, outro_path, output_path)
            .execute()
            .await?;

        self.check_output_produced(output_path, "Outro concatenation")?;
        Ok(())
    }

    async fn probe_duration(&self, video_path: &Path) -> Result<f64> {
        self.check_input_exists(video_path, "Video file")?;

        let output = self
            .probe_builder
            .probe_duration(video_path)
            .execute()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        debug!("ffprobe output: {}", stdout);

        let probe: ProbeOutput = serde_json::from_str(&stdout)
            .map_err(|e| KieloError::Processing(format!("Failed to parse ffprobe output: {}", e)))?;

        probe.duration_seconds().ok_or_else(|| {
            KieloError::Processing(format!(
                "Could not determine duration of {}",
                video_path.display()
            ))
        })
    }

    fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("-version")
            .output()
            .map_err(|e| KieloError::Processing(format!("Media processor not found: {}", e)))?;

        if output.status.success() {
            info!("Media processor is available");
            Ok(())
        } else {
            Err(KieloError::Processing(
                "Media processor version check failed".to_string(),
            ))
        }
    }
}
