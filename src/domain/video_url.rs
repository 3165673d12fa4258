use std::fmt;

use url::Url;

/// Absolute http(s) locator of a video or audio page.
///
/// Only syntax is checked; whether the host is supported is decided by the
/// fetch tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoUrl(Url);

impl VideoUrl {
    pub fn parse(raw: &str) -> Result<Self, VideoUrlError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(VideoUrlError::Empty);
        }

        let url = Url::parse(trimmed).map_err(|e| VideoUrlError::Invalid(e.to_string()))?;

        match url.scheme() {
            "http" | "https" => {}
            other => return Err(VideoUrlError::UnsupportedScheme(other.to_string())),
        }

        if url.host_str().is_none() {
            return Err(VideoUrlError::Invalid("missing host".to_string()));
        }

        Ok(Self(url))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }
}

impl fmt::Display for VideoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VideoUrlError {
    #[error("url is empty")]
    Empty,
    #[error("invalid url: {0}")]
    Invalid(String),
    #[error("unsupported url scheme: {0}")]
    UnsupportedScheme(String),
}
