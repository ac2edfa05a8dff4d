// Translation seam
//
// The remote translation API sits behind the TranslationBackend trait; the
// SegmentTranslator driver owns everything that must not depend on the
// provider: empty-text short-circuiting, batching, retry with backoff, and
// positional pairing back onto the source segments.

pub mod gemini;

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::TranslateConfig;
use crate::error::{KieloError, Result};
use crate::transcribe::Segment;

/// A segment paired with its target-language text.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedSegment {
    pub start: f64,
    pub end: f64,
    pub source: String,
    pub target: String,
}

/// Narrow capability interface: translate one batch of texts.
///
/// Implementations return exactly one string per input text, in input order.
/// The driver validates cardinality; backends report shape problems as
/// Translation errors.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>>;
}

/// Injectable sleep for retry backoff, so tests run retries without delay.
#[async_trait]
pub trait Delay: Send + Sync {
    async fn wait(&self, duration: Duration);
}

/// Production delay backed by the tokio timer
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Factory for creating translation backend instances
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create the default backend (Gemini REST API)
    pub fn create_backend(config: TranslateConfig) -> Result<Box<dyn TranslationBackend>> {
        Ok(Box::new(gemini::GeminiBackend::new(config)?))
    }
}

/// Drives segment translation over any backend.
pub struct SegmentTranslator {
    backend: Box<dyn TranslationBackend>,
    delay: Box<dyn Delay>,
    config: TranslateConfig,
}

impl SegmentTranslator {
    pub fn new(backend: Box<dyn TranslationBackend>, config: TranslateConfig) -> Self {
        Self {
            backend,
            delay: Box::new(TokioDelay),
            config,
        }
    }

    /// Replace the backoff sleep; used by tests.
    pub fn with_delay(mut self, delay: Box<dyn Delay>) -> Self {
        self.delay = delay;
        self
    }

    /// Translate all segments, preserving order and cardinality.
    ///
    /// Either every segment receives a translation or the run fails; a batch
    /// failure after retries never yields a partially translated sequence.
    pub async fn translate_segments(&self, segments: &[Segment]) -> Result<Vec<TranslatedSegment>> {
        let target = &self.config.target_language;
        info!(
            "Translating {} segments to {}",
            segments.len(),
            target
        );

        // Whitespace-only source text maps to an empty translation without a
        // network call.
        let mut translations = vec![String::new(); segments.len()];
        let pending: Vec<(usize, String)> = segments
            .iter()
            .enumerate()
            .filter(|(_, seg)| !seg.text.trim().is_empty())
            .map(|(idx, seg)| (idx, seg.text.trim().replace('\n', " ")))
            .collect();

        for chunk in pending.chunks(self.config.batch_size.max(1)) {
            let texts: Vec<String> = chunk.iter().map(|(_, text)| text.clone()).collect();
            let translated = self.translate_batch_with_retry(&texts, target).await?;

            if translated.len() != texts.len() {
                return Err(KieloError::Translation(format!(
                    "Response cardinality mismatch: sent {} texts, received {}",
                    texts.len(),
                    translated.len()
                )));
            }

            for ((idx, _), translation) in chunk.iter().zip(translated) {
                translations[*idx] = translation;
            }
        }

        let result = segments
            .iter()
            .zip(translations)
            .map(|(seg, target_text)| TranslatedSegment {
                start: seg.start,
                end: seg.end,
                source: seg.text.clone(),
                target: target_text,
            })
            .collect();

        info!("Translation complete");
        Ok(result)
    }

    /// Retry transient failures with bounded exponential backoff.
    async fn translate_batch_with_retry(
        &self,
        texts: &[String],
        target_language: &str,
    ) -> Result<Vec<String>> {
        let max_attempts = self.config.max_retries.max(1);
        let mut backoff = Duration::from_millis(self.config.initial_backoff_ms);

        for attempt in 1..=max_attempts {
            match self.backend.translate_batch(texts, target_language).await {
                Ok(translated) => return Ok(translated),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    warn!(
                        "Translation attempt {}/{} failed: {}; retrying in {:?}",
                        attempt, max_attempts, e, backoff
                    );
                    self.delay.wait(backoff).await;
                    backoff *= 2;
                }
                Err(e) => {
                    debug!("Translation failed after {} attempt(s)", attempt);
                    return Err(e);
                }
            }
        }

        unreachable!("retry loop always returns")
    }
}
