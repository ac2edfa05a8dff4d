use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

use super::{Segment, Transcriber};
use crate::config::TranscriberConfig;
use crate::error::{KieloError, Result};

/// Whisper CLI JSON output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperOutput {
    pub text: String,
    pub segments: Vec<WhisperSegment>,
    pub language: Option<String>,
}

/// Whisper CLI segment format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperSegment {
    pub id: u64,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub avg_logprob: Option<f64>,
    pub no_speech_prob: Option<f64>,
}

impl WhisperOutput {
    /// Convert the tool-specific format into pipeline segments.
    /// Whitespace-only segments are dropped; whisper occasionally emits them
    /// around music or breathing.
    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
            .into_iter()
            .filter(|seg| !seg.text.trim().is_empty())
            .map(|seg| Segment {
                start: seg.start,
                end: seg.end,
                text: seg.text.trim().replace('\n', " "),
            })
            .collect()
    }
}

/// Transcriber backed by the external whisper CLI
pub struct WhisperCliTranscriber {
    config: TranscriberConfig,
}

impl WhisperCliTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    /// Fail before spawning the tool when the audio file cannot be used.
    fn check_audio_readable(&self, audio_path: &Path) -> Result<()> {
        let metadata = std::fs::metadata(audio_path).map_err(|e| {
            KieloError::MediaRead(format!(
                "Audio file {} is not readable: {}",
                audio_path.display(),
                e
            ))
        })?;

        if metadata.len() == 0 {
            return Err(KieloError::MediaRead(format!(
                "Audio file {} is empty",
                audio_path.display()
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Transcriber for WhisperCliTranscriber {
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<Vec<Segment>> {
        self.check_audio_readable(audio_path)?;

        info!("Transcribing {} (language: {})", audio_path.display(), language);

        let temp_dir = tempfile::tempdir()
            .map_err(|e| KieloError::Transcription(format!("Failed to create temp directory: {}", e)))?;
        let output_dir = temp_dir.path();

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg(audio_path)
            .arg("--model").arg(&self.config.model)
            .arg("--language").arg(language)
            .arg("--beam_size").arg(self.config.beam_size.to_string())
            .arg("--output_dir").arg(output_dir)
            .arg("--output_format").arg("json");

        debug!("Executing whisper command: {:?}", cmd);

        let output = cmd
            .output()
            .map_err(|e| KieloError::Transcription(format!("Failed to execute whisper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KieloError::Transcription(format!(
                "Whisper failed: {}",
                stderr
            )));
        }

        let audio_stem = audio_path
            .file_stem()
            .ok_or_else(|| KieloError::Transcription("Invalid audio filename".to_string()))?;
        let json_file = output_dir.join(format!("{}.json", audio_stem.to_string_lossy()));

        let json_content = std::fs::read_to_string(&json_file)
            .map_err(|e| KieloError::Transcription(format!("Failed to read whisper output: {}", e)))?;

        let whisper_output: WhisperOutput = serde_json::from_str(&json_content)
            .map_err(|e| KieloError::Transcription(format!("Failed to parse whisper JSON: {}", e)))?;

        let segments = whisper_output.into_segments();
        info!("Transcription produced {} segments", segments.len());

        Ok(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn transcriber() -> WhisperCliTranscriber {
        WhisperCliTranscriber::new(Config::default().transcriber)
    }

    #[tokio::test]
    async fn test_missing_audio_is_media_read_error() {
        let result = transcriber()
            .transcribe(Path::new("/nonexistent/audio.wav"), "fi")
            .await;

        assert!(matches!(result, Err(KieloError::MediaRead(_))));
    }

    #[tokio::test]
    async fn test_empty_audio_is_media_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("empty.wav");
        std::fs::write(&audio, b"").unwrap();

        let result = transcriber().transcribe(&audio, "fi").await;

        assert!(matches!(result, Err(KieloError::MediaRead(_))));
    }

    #[test]
    fn test_parse_whisper_output() {
        let json = r#"{
            "text": " Hei maailma",
            "segments": [
                {"id": 0, "start": 0.0, "end": 1.0, "text": " Hei", "avg_logprob": -0.2, "no_speech_prob": 0.01},
                {"id": 1, "start": 1.2, "end": 2.4, "text": " maailma\n", "avg_logprob": -0.3, "no_speech_prob": 0.02}
            ],
            "language": "fi"
        }"#;

        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        let segments = output.into_segments();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hei");
        assert_eq!(segments[1].text, "maailma");
        assert_eq!(segments[1].start, 1.2);
    }

    #[test]
    fn test_silent_audio_output_yields_no_segments() {
        let json = r#"{"text": "", "segments": [], "language": "fi"}"#;

        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        assert!(output.into_segments().is_empty());
    }

    #[test]
    fn test_whitespace_only_segments_are_dropped() {
        let json = r#"{
            "text": " ",
            "segments": [
                {"id": 0, "start": 0.0, "end": 5.0, "text": "  ", "avg_logprob": null, "no_speech_prob": 0.9}
            ],
            "language": "fi"
        }"#;

        let output: WhisperOutput = serde_json::from_str(json).unwrap();
        assert!(output.into_segments().is_empty());
    }
}
