mod llm_client;
mod media_fetcher;
mod transcription_engine;

pub use llm_client::{LlmClient, LlmClientError, SamplingParams};
pub use media_fetcher::{FetchError, MediaFetcher};
pub use transcription_engine::{TranscriptionEngine, TranscriptionError};
