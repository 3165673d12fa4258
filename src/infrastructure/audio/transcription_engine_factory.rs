use std::sync::Arc;

use crate::application::ports::{TranscriptionEngine, TranscriptionError};
use crate::presentation::config::TranscriptionSettings;

use super::candle_whisper_engine::CandleWhisperEngine;
use super::openai_whisper_engine::OpenAiWhisperEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    Local,
    #[serde(rename = "openai")]
    OpenAi,
}

pub struct TranscriptionEngineFactory;

impl TranscriptionEngineFactory {
    /// Builds the configured engine once at startup. Local checkpoints are
    /// downloaded and loaded here, so the first run can take minutes.
    pub fn create(
        settings: &TranscriptionSettings,
    ) -> Result<Arc<dyn TranscriptionEngine>, TranscriptionError> {
        match settings.provider {
            TranscriptionProvider::Local => {
                Ok(Arc::new(CandleWhisperEngine::new(&settings.model)?))
            }
            TranscriptionProvider::OpenAi => {
                if settings.api_key.trim().is_empty() {
                    return Err(TranscriptionError::ModelLoadFailed(
                        "api key required for remote transcription (set OPENAI_API_KEY or APP_TRANSCRIPTION__API_KEY)"
                            .to_string(),
                    ));
                }
                Ok(Arc::new(OpenAiWhisperEngine::new(
                    settings.api_key.clone(),
                    settings.base_url.clone(),
                    Some(settings.model.clone()),
                )))
            }
        }
    }
}
