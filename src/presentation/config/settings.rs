use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File};
use serde::Deserialize;

use crate::infrastructure::audio::TranscriptionProvider;

use super::Environment;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub media: MediaSettings,
    pub transcription: TranscriptionSettings,
    pub llm: LlmSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Map error kinds to distinct statuses instead of a uniform 500.
    pub differentiate_error_status: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    pub yt_dlp_path: String,
    pub working_dir: PathBuf,
    pub audio_format: String,
    /// 0 disables the limit.
    pub download_timeout_secs: u64,
}

impl MediaSettings {
    pub fn download_timeout(&self) -> Option<Duration> {
        (self.download_timeout_secs > 0).then(|| Duration::from_secs(self.download_timeout_secs))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSettings {
    pub provider: TranscriptionProvider,
    pub model: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "lmstudio")]
    LmStudio,
    Azure,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub api_key: String,
    pub chat_model: String,
    pub base_url: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_api_version: String,
    pub max_tokens: Option<usize>,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub json_format: bool,
}

impl Settings {
    /// Built-in defaults, before any file or environment source.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8000)?
            .set_default("server.differentiate_error_status", false)?
            .set_default("media.yt_dlp_path", "yt-dlp")?
            .set_default("media.working_dir", "downloads")?
            .set_default("media.audio_format", "mp3")?
            .set_default("media.download_timeout_secs", 0)?
            .set_default("transcription.provider", "local")?
            .set_default("transcription.model", "openai/whisper-base")?
            .set_default("transcription.api_key", "")?
            .set_default("llm.provider", "openai")?
            .set_default("llm.api_key", "")?
            .set_default("llm.chat_model", "gpt-4")?
            .set_default("llm.azure_api_version", "2024-02-01")?
            .set_default("llm.temperature", 0.3)?
            .set_default("logging.json_format", false)
    }

    /// Defaults, then `appsettings.{env}` if present, then `APP_*` variables
    /// (`APP_LLM__CHAT_MODEL`), then `OPENAI_API_KEY` for empty keys.
    pub fn load(environment: Environment) -> Result<Self, ConfigError> {
        let builder = Self::defaults()?
            .add_source(File::with_name(&environment.settings_file()).required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut settings = Self::from_builder(builder)?;
        settings.fill_api_keys(std::env::var("OPENAI_API_KEY").ok());
        Ok(settings)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// Uses a shared credential wherever no specific key was configured.
    pub fn fill_api_keys(&mut self, shared_key: Option<String>) {
        let Some(key) = shared_key.filter(|k| !k.trim().is_empty()) else {
            return;
        };
        if self.llm.api_key.is_empty() {
            self.llm.api_key = key.clone();
        }
        if self.transcription.api_key.is_empty() {
            self.transcription.api_key = key;
        }
    }
}
