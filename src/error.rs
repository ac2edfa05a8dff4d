use thiserror::Error;

#[derive(Error, Debug)]
pub enum KieloError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Media read error: {0}")]
    MediaRead(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Translation error: {0}")]
    Translation(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Cue timing error: {0}")]
    CueTiming(String),

    #[error("Media processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

impl KieloError {
    /// Whether a retry has any chance of succeeding. Only network-level
    /// failures and rate limiting qualify; auth failures and malformed
    /// responses do not.
    pub fn is_transient(&self) -> bool {
        match self {
            KieloError::Http(e) => match e.status() {
                Some(status) => status.as_u16() == 429 || status.is_server_error(),
                // Connect failures, timeouts, and body errors carry no status.
                None => true,
            },
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, KieloError>;
