// Transcription seam
//
// The external speech-to-text tool is hidden behind the Transcriber trait so
// the rest of the pipeline only sees ordered Segment records. Tests plug in
// deterministic implementations instead of the whisper CLI.

pub mod whisper_cli;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config::TranscriberConfig;
use crate::error::Result;

/// A time-bounded span of recognized source-language speech.
///
/// Segments are produced in ascending start order and never overlap.
/// Silence between spans is represented by gaps, not by segments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Recognized source-language text
    pub text: String,
}

/// Main trait for transcription operations
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into ordered segments.
    ///
    /// A silent recording yields an empty vector, not an error.
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<Vec<Segment>>;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create the default transcriber (external whisper CLI)
    pub fn create_default(config: TranscriberConfig) -> Box<dyn Transcriber> {
        Box::new(whisper_cli::WhisperCliTranscriber::new(config))
    }
}
