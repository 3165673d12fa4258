use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tempfile::TempDir;

use recipe_scribe::application::ports::{
    FetchError, MediaFetcher, SamplingParams, TranscriptionEngine, TranscriptionError,
};
use recipe_scribe::application::services::{RecipeExtractor, RecipePipeline};
use recipe_scribe::domain::{ArtifactId, AudioArtifact, Transcript, VideoUrl};
use recipe_scribe::infrastructure::llm::{MockLlmClient, MockReply};
use recipe_scribe::infrastructure::storage::WorkingStorage;

pub const COOKING_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

pub const SPOKEN_RECIPE: &str = "Today we're making a classic margherita pizza. \
You need five hundred grams of flour, three hundred milliliters of water, \
a can of tomatoes and fresh mozzarella. Knead the dough, let it rest for an hour, \
then bake at two fifty for ten minutes.";

pub const RECIPE_REPLY: &str = r#"{
  "recipe_name": "Margherita Pizza",
  "ingredients": ["500g flour", "300ml water", "1 can tomatoes", "fresh mozzarella"],
  "instructions": ["Knead the dough", "Rest for an hour", "Bake at 250C for 10 minutes"],
  "estimated_time": "1 hour 10 minutes",
  "cuisine_type": "Italian"
}"#;

pub enum FetchOutcome {
    Audio,
    Fail(&'static str),
}

/// Writes a small fake mp3 into working storage, the way the real fetcher does.
pub struct FakeMediaFetcher {
    storage: WorkingStorage,
    outcome: FetchOutcome,
    calls: AtomicUsize,
}

impl FakeMediaFetcher {
    pub fn new(storage: WorkingStorage, outcome: FetchOutcome) -> Self {
        Self {
            storage,
            outcome,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaFetcher for FakeMediaFetcher {
    async fn fetch(&self, _url: &VideoUrl) -> Result<AudioArtifact, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            FetchOutcome::Audio => {
                let id = ArtifactId::new();
                let path = self.storage.artifact_path(&id, "mp3");
                tokio::fs::write(&path, b"ID3fake-audio").await?;
                Ok(AudioArtifact::new(id, path))
            }
            FetchOutcome::Fail(message) => Err(FetchError::DownloadFailed(message.to_string())),
        }
    }
}

pub enum TranscribeOutcome {
    Text(&'static str),
    Undecodable,
    Panic,
}

/// Returns a fixed transcript and records which files it was asked to read.
pub struct FakeTranscriptionEngine {
    outcome: TranscribeOutcome,
    seen: Mutex<Vec<(PathBuf, bool)>>,
}

impl FakeTranscriptionEngine {
    pub fn new(outcome: TranscribeOutcome) -> Self {
        Self {
            outcome,
            seen: Mutex::new(Vec::new()),
        }
    }

    /// (path, whether the file existed at transcription time)
    pub fn seen(&self) -> Vec<(PathBuf, bool)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptionEngine for FakeTranscriptionEngine {
    async fn transcribe(&self, audio: &AudioArtifact) -> Result<Transcript, TranscriptionError> {
        let existed = audio.path().exists();
        self.seen
            .lock()
            .unwrap()
            .push((audio.path().to_path_buf(), existed));
        match self.outcome {
            TranscribeOutcome::Text(text) => Ok(Transcript::new(text)),
            TranscribeOutcome::Undecodable => Err(TranscriptionError::DecodingFailed(
                "probe: unsupported format".to_string(),
            )),
            TranscribeOutcome::Panic => panic!("whisper exploded"),
        }
    }
}

pub struct Harness {
    _dir: TempDir,
    pub storage: WorkingStorage,
    pub fetcher: Arc<FakeMediaFetcher>,
    pub engine: Arc<FakeTranscriptionEngine>,
    pub llm: Arc<MockLlmClient>,
    pub pipeline: Arc<RecipePipeline<FakeMediaFetcher, MockLlmClient>>,
}

impl Harness {
    pub fn new(fetch: FetchOutcome, transcribe: TranscribeOutcome, reply: MockReply) -> Self {
        let dir = TempDir::new().unwrap();
        let storage = WorkingStorage::new(dir.path().join("downloads")).unwrap();
        let fetcher = Arc::new(FakeMediaFetcher::new(storage.clone(), fetch));
        let engine = Arc::new(FakeTranscriptionEngine::new(transcribe));
        let llm = Arc::new(MockLlmClient::new(reply));

        let engine_port: Arc<dyn TranscriptionEngine> = engine.clone();
        let pipeline = Arc::new(RecipePipeline::new(
            Arc::clone(&fetcher),
            engine_port,
            RecipeExtractor::new(Arc::clone(&llm), SamplingParams::default()),
        ));

        Self {
            _dir: dir,
            storage,
            fetcher,
            engine,
            llm,
            pipeline,
        }
    }

    pub fn happy() -> Self {
        Self::new(
            FetchOutcome::Audio,
            TranscribeOutcome::Text(SPOKEN_RECIPE),
            MockReply::Text(RECIPE_REPLY.to_string()),
        )
    }

    pub async fn leftover_files(&self) -> usize {
        self.storage.file_count().await.unwrap()
    }
}
