use async_trait::async_trait;

use crate::domain::{AudioArtifact, Transcript};

/// Speech-to-text over a whole audio artifact.
///
/// Implementations are loaded once and shared across requests, so they must be
/// safe to call concurrently or serialize access internally.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    async fn transcribe(&self, audio: &AudioArtifact) -> Result<Transcript, TranscriptionError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("audio file unreadable: {0}")]
    Unreadable(String),
    #[error("audio decoding failed: {0}")]
    DecodingFailed(String),
    #[error("transcription failed: {0}")]
    TranscriptionFailed(String),
    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),
    #[error("model loading failed: {0}")]
    ModelLoadFailed(String),
    #[error("api request failed: {0}")]
    ApiRequestFailed(String),
}
