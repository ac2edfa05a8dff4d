use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::TranslationBackend;
use crate::config::TranslateConfig;
use crate::error::{KieloError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    #[serde(rename = "systemInstruction")]
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

/// Translation backend for the Gemini generateContent REST API
pub struct GeminiBackend {
    client: Client,
    config: TranslateConfig,
    api_key: String,
    numbering: Regex,
}

impl GeminiBackend {
    /// The credential is resolved eagerly so a missing key fails the run
    /// before any video work starts.
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            KieloError::Authentication(format!(
                "Missing {} in environment",
                config.api_key_env
            ))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(KieloError::Http)?;

        Ok(Self {
            client,
            config,
            api_key,
            numbering: Regex::new(r"^\d+[.)]\s*").expect("numbering pattern is valid"),
        })
    }

    fn request_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    /// One numbered line per text, so the response can be paired back by
    /// position.
    fn build_prompt(&self, texts: &[String]) -> String {
        let numbered = texts
            .iter()
            .enumerate()
            .map(|(idx, text)| format!("{}. {}", idx + 1, text))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "Translate each numbered line to the target language (code: {}). \
             Respond with the translations only, one per line, in the same \
             numbering order, without extra commentary.\n\n{}",
            self.config.target_language, numbered
        )
    }

    /// Split the model output into one translation per line, dropping blank
    /// lines and the echoed numbering. A line that is numbering only ("3.")
    /// survives as an empty translation.
    fn clean_response(&self, text: &str) -> Vec<String> {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| self.numbering.replace(line, "").trim().to_string())
            .collect()
    }
}

#[async_trait]
impl TranslationBackend for GeminiBackend {
    async fn translate_batch(&self, texts: &[String], target_language: &str) -> Result<Vec<String>> {
        let request = GenerateContentRequest {
            system_instruction: Content {
                parts: vec![Part {
                    text: format!(
                        "You are a professional translator. Translate into the \
                         language with code {}. Preserve meaning, tone, and proper \
                         names. Return only the translated text.",
                        target_language
                    ),
                }],
            },
            contents: vec![Content {
                parts: vec![Part {
                    text: self.build_prompt(texts),
                }],
            }],
            generation_config: GenerationConfig { temperature: 0.0 },
        };

        let url = self.request_url();
        debug!("Sending translation request to {}", url);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateContentResponse = response.json().await?;
        let text = body.text();

        if text.trim().is_empty() {
            return Err(KieloError::Translation(
                "Empty translation response".to_string(),
            ));
        }

        Ok(self.clean_response(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> GeminiBackend {
        let mut config = crate::config::Config::default().translate;
        config.api_key_env = "KIELO_TEST_GEMINI_KEY".to_string();
        std::env::set_var(&config.api_key_env, "test-key");
        GeminiBackend::new(config).unwrap()
    }

    #[test]
    fn test_missing_api_key_is_authentication_error() {
        let mut config = crate::config::Config::default().translate;
        config.api_key_env = "KIELO_TEST_GEMINI_KEY_UNSET".to_string();
        std::env::remove_var(&config.api_key_env);

        let result = GeminiBackend::new(config);
        assert!(matches!(result, Err(KieloError::Authentication(_))));
    }

    #[test]
    fn test_prompt_numbers_every_line() {
        let backend = backend();
        let texts = vec!["Hei".to_string(), "Maailma".to_string()];
        let prompt = backend.build_prompt(&texts);

        assert!(prompt.contains("1. Hei"));
        assert!(prompt.contains("2. Maailma"));
        assert!(prompt.contains("one per line"));
    }

    #[test]
    fn test_clean_response_strips_numbering() {
        let backend = backend();
        let lines = backend.clean_response("1. Hello\n\n2) World\n3.\n");

        assert_eq!(lines, vec!["Hello", "World", ""]);
    }

    #[test]
    fn test_clean_response_keeps_unnumbered_lines() {
        let backend = backend();
        let lines = backend.clean_response("Hello\nWorld");

        assert_eq!(lines, vec!["Hello", "World"]);
    }

    #[test]
    fn test_response_text_extraction() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "1. Hello\n"}, {"text": "2. World"}]}}
            ]
        }"#;

        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text(), "1. Hello\n2. World");
    }

    #[test]
    fn test_empty_candidates_yield_empty_text() {
        let response: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(response.text(), "");
    }

    #[test]
    fn test_request_url_trims_trailing_slash() {
        let mut config = crate::config::Config::default().translate;
        config.api_key_env = "KIELO_TEST_GEMINI_KEY".to_string();
        config.endpoint = "https://generativelanguage.googleapis.com/".to_string();
        std::env::set_var(&config.api_key_env, "test-key");

        let backend = GeminiBackend::new(config).unwrap();
        assert_eq!(
            backend.request_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}
