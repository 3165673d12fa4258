use std::io;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{AudioArtifact, VideoUrl, VideoUrlError};

/// Retrieves the best available audio track of a video into working storage.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &VideoUrl) -> Result<AudioArtifact, FetchError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    InvalidUrl(#[from] VideoUrlError),
    #[error("fetch tool unavailable: {0}")]
    ToolUnavailable(String),
    #[error("download failed: {0}")]
    DownloadFailed(String),
    #[error("no audio produced: {0}")]
    NoAudio(String),
    #[error("download timed out after {0:?}")]
    TimedOut(Duration),
    #[error("working storage error: {0}")]
    Storage(#[from] io::Error),
}
