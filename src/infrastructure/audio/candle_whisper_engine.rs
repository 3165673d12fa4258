use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::whisper::{self as m, Config};
use hf_hub::api::sync::Api;
use hf_hub::{Repo, RepoType};
use tokenizers::Tokenizer;

use crate::application::ports::{TranscriptionEngine, TranscriptionError};
use crate::domain::{AudioArtifact, Transcript};

use super::audio_decoder::decode_file_to_pcm;

const MEL_FILTERS_REPO: &str = "FL33TW00D-HF/whisper-base";
const MAX_DECODE_TOKENS: usize = 224;

/// Local Whisper inference on CPU.
///
/// The model is loaded once; windows are decoded on a blocking thread and
/// calls from concurrent requests queue on the model mutex.
pub struct CandleWhisperEngine {
    runtime: Arc<Mutex<WhisperRuntime>>,
}

struct WhisperRuntime {
    model: m::model::Whisper,
    tokenizer: Tokenizer,
    config: Config,
    device: Device,
    mel_filters: Vec<f32>,
    special: SpecialTokens,
    /// Empty for English-only checkpoints.
    language_tokens: Vec<(String, u32)>,
}

struct SpecialTokens {
    sot: u32,
    transcribe: u32,
    no_timestamps: u32,
    eot: u32,
}

impl CandleWhisperEngine {
    pub fn new(model_id: &str) -> Result<Self, TranscriptionError> {
        let device = Device::Cpu;

        tracing::info!(
            device = ?device,
            model = model_id,
            "Loading Whisper model"
        );

        let api = Api::new().map_err(|e| TranscriptionError::ModelLoadFailed(e.to_string()))?;
        let repo = api.repo(Repo::new(model_id.to_string(), RepoType::Model));
        let fetch = |file: &str| {
            repo.get(file)
                .map_err(|e| TranscriptionError::ModelLoadFailed(format!("{}: {}", file, e)))
        };

        let config_path = fetch("config.json")?;
        let tokenizer_path = fetch("tokenizer.json")?;
        let weights_path = fetch("model.safetensors")?;

        let config: Config = std::fs::read_to_string(&config_path)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("read config: {}", e)))
            .and_then(|raw| {
                serde_json::from_str(&raw).map_err(|e| {
                    TranscriptionError::ModelLoadFailed(format!("parse config: {}", e))
                })
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("tokenizer: {}", e)))?;

        let mel_file = if config.num_mel_bins == 128 {
            "melfilters128.bytes"
        } else {
            "melfilters.bytes"
        };
        let mel_path = api
            .repo(Repo::new(MEL_FILTERS_REPO.to_string(), RepoType::Model))
            .get(mel_file)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("{}: {}", mel_file, e)))?;
        let mel_bytes = std::fs::read(&mel_path)
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("mel filters: {}", e)))?;
        let mel_filters = read_mel_filters(&mel_bytes, config.num_mel_bins)?;

        // SAFETY: safetensors files are memory-mapped read-only
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], m::DTYPE, &device)
                .map_err(|e| TranscriptionError::ModelLoadFailed(format!("weights: {}", e)))?
        };
        let model = m::model::Whisper::load(&vb, config.clone())
            .map_err(|e| TranscriptionError::ModelLoadFailed(format!("model: {}", e)))?;

        let special = SpecialTokens {
            sot: token_id(&tokenizer, m::SOT_TOKEN)?,
            transcribe: token_id(&tokenizer, m::TRANSCRIBE_TOKEN)?,
            no_timestamps: token_id(&tokenizer, m::NO_TIMESTAMPS_TOKEN)?,
            eot: token_id(&tokenizer, m::EOT_TOKEN)?,
        };

        let language_tokens = if model_id.ends_with(".en") {
            Vec::new()
        } else {
            let mut tokens: Vec<(String, u32)> = tokenizer
                .get_vocab(true)
                .into_iter()
                .filter(|(token, _)| is_language_token(token))
                .collect();
            tokens.sort_by_key(|(_, id)| *id);
            tokens
        };

        tracing::info!(
            languages = language_tokens.len(),
            mel_bins = config.num_mel_bins,
            "Whisper model loaded"
        );

        Ok(Self {
            runtime: Arc::new(Mutex::new(WhisperRuntime {
                model,
                tokenizer,
                config,
                device,
                mel_filters,
                special,
                language_tokens,
            })),
        })
    }
}

#[async_trait]
impl TranscriptionEngine for CandleWhisperEngine {
    async fn transcribe(&self, audio: &AudioArtifact) -> Result<Transcript, TranscriptionError> {
        let path = audio.path().to_path_buf();
        let runtime = Arc::clone(&self.runtime);

        let text = tokio::task::spawn_blocking(move || {
            let pcm = decode_file_to_pcm(&path)?;
            let mut runtime = acquire(runtime.as_ref());
            runtime.transcribe_pcm(&pcm)
        })
        .await
        .map_err(|e| TranscriptionError::TranscriptionFailed(format!("worker: {}", e)))??;

        tracing::info!(
            artifact_id = %audio.id(),
            chars = text.len(),
            "Audio transcription completed"
        );

        Ok(Transcript::new(text))
    }
}

impl WhisperRuntime {
    fn transcribe_pcm(&mut self, pcm: &[f32]) -> Result<String, TranscriptionError> {
        // A decode that failed or panicked midway leaves its cache behind.
        self.model.reset_kv_cache();

        let mut language = None;
        let mut segments: Vec<String> = Vec::new();

        for (index, window) in pcm.chunks(m::N_SAMPLES).enumerate() {
            let mel = self.mel_for(window)?;
            let features = self
                .model
                .encoder
                .forward(&mel, true)
                .map_err(failed("encoder"))?;

            if index == 0 {
                language = self.detect_language(&features)?;
            }

            tracing::debug!(segment = index, "Transcribing audio window");
            let text = self.decode_window(&features, language)?;
            if !text.is_empty() {
                segments.push(text);
            }
        }

        Ok(segments.join(" "))
    }

    fn mel_for(&self, window: &[f32]) -> Result<Tensor, TranscriptionError> {
        let mut samples = window.to_vec();
        samples.resize(m::N_SAMPLES, 0.0);

        let mel = m::audio::pcm_to_mel(&self.config, &samples, &self.mel_filters);
        let n_mel = self.config.num_mel_bins;
        let n_frames = mel.len() / n_mel;

        Tensor::from_vec(mel, (1, n_mel, n_frames), &self.device).map_err(failed("mel tensor"))
    }

    /// Picks the most likely language token right after start-of-transcript.
    fn detect_language(&mut self, features: &Tensor) -> Result<Option<u32>, TranscriptionError> {
        if self.language_tokens.is_empty() {
            return Ok(None);
        }

        let input = Tensor::new(&[self.special.sot], &self.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(failed("language input"))?;
        let hidden = self
            .model
            .decoder
            .forward(&input, features, true)
            .map_err(failed("language decoder"))?;
        let logits = hidden
            .squeeze(0)
            .and_then(|h| self.model.decoder.final_linear(&h))
            .and_then(|l| l.get(0))
            .and_then(|l| l.to_vec1::<f32>())
            .map_err(failed("language logits"))?;

        let best = self
            .language_tokens
            .iter()
            .filter_map(|(name, id)| logits.get(*id as usize).map(|score| (name, *id, *score)))
            .max_by(|a, b| a.2.total_cmp(&b.2));

        if let Some((name, _, _)) = best {
            tracing::debug!(language = %name, "Detected spoken language");
        }

        Ok(best.map(|(_, id, _)| id))
    }

    fn decode_window(
        &mut self,
        features: &Tensor,
        language: Option<u32>,
    ) -> Result<String, TranscriptionError> {
        let mut tokens = vec![self.special.sot];
        tokens.extend(language);
        tokens.push(self.special.transcribe);
        tokens.push(self.special.no_timestamps);
        let prompt_len = tokens.len();

        for step in 0..MAX_DECODE_TOKENS {
            let input = Tensor::new(tokens.as_slice(), &self.device)
                .and_then(|t| t.unsqueeze(0))
                .map_err(failed("token tensor"))?;
            let hidden = self
                .model
                .decoder
                .forward(&input, features, step == 0)
                .map_err(failed("decoder"))?;
            let logits = hidden
                .squeeze(0)
                .and_then(|h| self.model.decoder.final_linear(&h))
                .map_err(failed("linear"))?;
            let seq_len = logits.dim(0).map_err(failed("logits"))?;
            let next = logits
                .get(seq_len - 1)
                .and_then(|l| l.argmax(0))
                .and_then(|t| t.to_scalar::<u32>())
                .map_err(failed("argmax"))?;

            if next == self.special.eot {
                break;
            }
            tokens.push(next);
        }

        self.model.reset_kv_cache();

        let text = self
            .tokenizer
            .decode(&tokens[prompt_len..], true)
            .map_err(|e| TranscriptionError::TranscriptionFailed(format!("detokenize: {}", e)))?;

        Ok(text.trim().to_string())
    }
}

/// Locks the shared model even if an earlier request panicked while holding
/// it. The runtime resets its decoder state on every call, so the poisoned
/// value is still usable.
fn acquire<T>(lock: &Mutex<T>) -> MutexGuard<'_, T> {
    lock.lock().unwrap_or_else(PoisonError::into_inner)
}

/// True for Whisper language markers such as `<|en|>` or `<|haw|>`.
pub fn is_language_token(token: &str) -> bool {
    token
        .strip_prefix("<|")
        .and_then(|rest| rest.strip_suffix("|>"))
        .map(|code| (2..=3).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_lowercase()))
        .unwrap_or(false)
}

fn failed(stage: &'static str) -> impl Fn(candle_core::Error) -> TranscriptionError {
    move |e| TranscriptionError::TranscriptionFailed(format!("{}: {}", stage, e))
}

fn token_id(tokenizer: &Tokenizer, token: &str) -> Result<u32, TranscriptionError> {
    tokenizer
        .token_to_id(token)
        .ok_or_else(|| TranscriptionError::ModelLoadFailed(format!("token not found: {}", token)))
}

fn read_mel_filters(bytes: &[u8], num_mel_bins: usize) -> Result<Vec<f32>, TranscriptionError> {
    let expected_len = num_mel_bins * (m::N_FFT / 2 + 1);
    if bytes.len() < expected_len * 4 {
        return Err(TranscriptionError::ModelLoadFailed(format!(
            "mel filters file too small: {} bytes, expected at least {}",
            bytes.len(),
            expected_len * 4
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .take(expected_len)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}
