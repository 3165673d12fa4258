use async_trait::async_trait;
use reqwest::{StatusCode, multipart};

use crate::application::ports::{TranscriptionEngine, TranscriptionError};
use crate::domain::{AudioArtifact, Transcript};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "whisper-1";

/// Upload cap of the hosted transcription endpoint.
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Whisper behind an OpenAI-compatible `/audio/transcriptions` endpoint.
///
/// No `language` field is sent, so the service detects it.
pub struct OpenAiWhisperEngine {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl OpenAiWhisperEngine {
    pub fn new(api_key: String, base_url: Option<String>, model: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: format!("{}/audio/transcriptions", base_url.trim_end_matches('/')),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn read_audio(audio: &AudioArtifact) -> Result<Vec<u8>, TranscriptionError> {
        let unreadable = |e: std::io::Error| {
            TranscriptionError::Unreadable(format!("{}: {}", audio.path().display(), e))
        };

        let size = tokio::fs::metadata(audio.path()).await.map_err(unreadable)?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(TranscriptionError::TranscriptionFailed(format!(
                "audio is {} bytes, service accepts at most {}",
                size, MAX_UPLOAD_BYTES
            )));
        }

        tokio::fs::read(audio.path()).await.map_err(unreadable)
    }

    fn build_form(
        &self,
        audio: &AudioArtifact,
        data: Vec<u8>,
    ) -> Result<multipart::Form, TranscriptionError> {
        let file_name = audio
            .path()
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio.mp3")
            .to_string();
        let mime = mime_for(&file_name);

        let file_part = multipart::Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("mime: {}", e)))?;

        Ok(multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "text")
            .part("file", file_part))
    }
}

#[async_trait]
impl TranscriptionEngine for OpenAiWhisperEngine {
    async fn transcribe(&self, audio: &AudioArtifact) -> Result<Transcript, TranscriptionError> {
        let data = Self::read_audio(audio).await?;
        let bytes = data.len();
        let form = self.build_form(audio, data)?;

        tracing::debug!(
            model = %self.model,
            artifact_id = %audio.id(),
            bytes,
            "Uploading audio for transcription"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(status_error(status, body));
        }

        let text = response
            .text()
            .await
            .map_err(|e| TranscriptionError::ApiRequestFailed(format!("body: {}", e)))?;
        let transcript = Transcript::new(text.trim());

        tracing::info!(
            artifact_id = %audio.id(),
            chars = transcript.char_count(),
            "Remote transcription completed"
        );

        Ok(transcript)
    }
}

/// 400 means the service could not decode the upload.
fn status_error(status: StatusCode, body: String) -> TranscriptionError {
    let detail = format!("status {}: {}", status, body);
    if status == StatusCode::BAD_REQUEST {
        TranscriptionError::DecodingFailed(detail)
    } else {
        TranscriptionError::ApiRequestFailed(detail)
    }
}

fn mime_for(file_name: &str) -> &'static str {
    match file_name.rsplit('.').next() {
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("wav") => "audio/wav",
        Some("ogg") | Some("opus") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("webm") => "audio/webm",
        _ => "application/octet-stream",
    }
}
