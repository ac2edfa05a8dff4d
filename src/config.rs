use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{KieloError, Result};

fn default_batch_size() -> usize {
    32
}

fn default_initial_backoff_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub translate: TranslateConfig,
    pub cue: CueConfig,
    pub style: StyleConfig,
    pub media: MediaConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriberConfig {
    /// Path to the whisper CLI binary
    pub binary_path: String,
    /// Whisper model name
    pub model: String,
    /// Source language code (fixed for the whole batch)
    pub language: String,
    /// Beam size passed to the model
    pub beam_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Translation API base URL
    pub endpoint: String,
    /// Model name for translation
    pub model: String,
    /// Target language code (fixed for the whole batch)
    pub target_language: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Number of segments per request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum attempts for a failed request
    pub max_retries: u32,
    /// First backoff delay in milliseconds; doubles per attempt
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CueConfig {
    /// Minimum on-screen duration in seconds
    pub min_duration: f64,
    /// Below this duration a clamped cue is merged into the next one
    pub hard_floor: f64,
    /// Gaps shorter than this are snapped closed
    pub gap_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StyleConfig {
    /// Font family for both lines
    pub font: String,
    /// Font size in script units
    pub font_size: u32,
    /// Source-language line colour (ASS &HAABBGGRR notation)
    pub source_colour: String,
    /// Target-language line colour
    pub target_colour: String,
    /// Outline width
    pub outline: u32,
    /// Numpad alignment (2 = bottom centre)
    pub alignment: u32,
    /// Vertical margin in script units
    pub margin_v: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Path to ffprobe binary
    pub probe_binary_path: String,
    /// Additional encoding options for subtitle embedding
    pub subtitle_options: Vec<String>,
    /// Playback slowdown factor (1.25 means 20% slower); 1.0 disables the step
    pub speed_factor: f64,
    /// Background music file; the mix step is skipped when unset
    pub music_file: Option<PathBuf>,
    /// Volume reduction for background music in dB
    pub music_volume_db: f64,
    /// Outro clip appended to every video; skipped when unset
    pub outro_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory scanned for source videos
    pub source_dir: PathBuf,
    /// Directory for finished videos
    pub output_dir: PathBuf,
    /// Directory for rendered subtitle tracks
    pub subtitles_dir: PathBuf,
    /// Skip videos whose output file already exists
    pub skip_existing: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transcriber: TranscriberConfig {
                binary_path: "whisper".to_string(),
                model: "large-v3".to_string(),
                language: "fi".to_string(),
                beam_size: 5,
            },
            translate: TranslateConfig {
                endpoint: "https://generativelanguage.googleapis.com".to_string(),
                model: "gemini-2.5-flash".to_string(),
                target_language: "en".to_string(),
                api_key_env: "GEMINI_API_KEY".to_string(),
                batch_size: 32,
                max_retries: 3,
                initial_backoff_ms: 500,
            },
            cue: CueConfig {
                min_duration: 1.0,
                hard_floor: 0.3,
                gap_threshold: 0.2,
            },
            style: StyleConfig {
                font: "Roboto".to_string(),
                font_size: 12,
                source_colour: "&H00EA72AC".to_string(),
                target_colour: "&H00FFFFFF".to_string(),
                outline: 1,
                alignment: 2,
                margin_v: 25,
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                probe_binary_path: "ffprobe".to_string(),
                subtitle_options: vec![],
                speed_factor: 1.25,
                music_file: Some(PathBuf::from("presets/background_music.mp3")),
                music_volume_db: -15.0,
                outro_file: Some(PathBuf::from("presets/outro.mp4")),
            },
            batch: BatchConfig {
                source_dir: PathBuf::from("source"),
                output_dir: PathBuf::from("output"),
                subtitles_dir: PathBuf::from("subtitles"),
                skip_existing: true,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| KieloError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| KieloError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| KieloError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| KieloError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();

        assert_eq!(parsed.transcriber.language, "fi");
        assert_eq!(parsed.translate.target_language, "en");
        assert_eq!(parsed.translate.batch_size, 32);
        assert_eq!(parsed.cue.min_duration, 1.0);
        assert_eq!(parsed.batch.source_dir, PathBuf::from("source"));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let minimal = r#"
            [transcriber]
            binary_path = "whisper"
            model = "base"
            language = "fi"
            beam_size = 5

            [translate]
            endpoint = "https://generativelanguage.googleapis.com"
            model = "gemini-2.5-flash"
            target_language = "en"
            api_key_env = "GEMINI_API_KEY"
            max_retries = 3

            [cue]
            min_duration = 1.0
            hard_floor = 0.3
            gap_threshold = 0.2

            [style]
            font = "Roboto"
            font_size = 12
            source_colour = "&H00EA72AC"
            target_colour = "&H00FFFFFF"
            outline = 1
            alignment = 2
            margin_v = 25

            [media]
            binary_path = "ffmpeg"
            probe_binary_path = "ffprobe"
            subtitle_options = []
            speed_factor = 1.25
            music_volume_db = -15.0

            [batch]
            source_dir = "source"
            output_dir = "output"
            subtitles_dir = "subtitles"
            skip_existing = true
        "#;

        let config: Config = toml::from_str(minimal).unwrap();
        assert_eq!(config.translate.batch_size, 32);
        assert_eq!(config.translate.initial_backoff_ms, 500);
        assert!(config.media.music_file.is_none());
        assert!(config.media.outro_file.is_none());
    }
}
