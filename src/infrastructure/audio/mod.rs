pub mod audio_decoder;
mod candle_whisper_engine;
mod openai_whisper_engine;
mod transcription_engine_factory;

pub use candle_whisper_engine::{CandleWhisperEngine, is_language_token};
pub use openai_whisper_engine::{MAX_UPLOAD_BYTES, OpenAiWhisperEngine};
pub use transcription_engine_factory::{TranscriptionEngineFactory, TranscriptionProvider};
