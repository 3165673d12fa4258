use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;

use crate::application::ports::{
    FetchError, LlmClient, LlmClientError, MediaFetcher, TranscriptionEngine, TranscriptionError,
};
use crate::domain::{AudioArtifact, RecipeRecord, VideoUrl};

use super::artifact_guard::ArtifactGuard;
use super::recipe_extractor::{ExtractionError, RecipeExtractor};

/// Fetch, transcribe and extract for one URL, strictly in that order.
///
/// The audio artifact produced by the fetch stage is removed before `handle`
/// returns, whatever the outcome.
pub struct RecipePipeline<M: ?Sized, L: ?Sized>
where
    M: MediaFetcher,
    L: LlmClient,
{
    media_fetcher: Arc<M>,
    transcription_engine: Arc<dyn TranscriptionEngine>,
    recipe_extractor: RecipeExtractor<L>,
}

impl<M: ?Sized, L: ?Sized> RecipePipeline<M, L>
where
    M: MediaFetcher,
    L: LlmClient,
{
    pub fn new(
        media_fetcher: Arc<M>,
        transcription_engine: Arc<dyn TranscriptionEngine>,
        recipe_extractor: RecipeExtractor<L>,
    ) -> Self {
        Self {
            media_fetcher,
            transcription_engine,
            recipe_extractor,
        }
    }

    #[tracing::instrument(skip(self, raw_url), fields(url = %raw_url))]
    pub async fn handle(&self, raw_url: &str) -> Result<RecipeRecord, PipelineError> {
        let started = Instant::now();
        let url = VideoUrl::parse(raw_url).map_err(FetchError::from)?;

        let artifact = guarded(self.media_fetcher.fetch(&url)).await??;
        tracing::info!(
            artifact_id = %artifact.id(),
            host = url.host(),
            "Audio fetched"
        );

        let guard = ArtifactGuard::new(artifact);
        let outcome = guarded(self.transcribe_and_extract(guard.artifact()))
            .await
            .and_then(|result| result);
        guard.release().await;

        match &outcome {
            Ok(_) => tracing::info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Recipe pipeline completed"
            ),
            Err(e) => tracing::warn!(
                kind = e.kind(),
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Recipe pipeline failed"
            ),
        }

        outcome
    }

    async fn transcribe_and_extract(
        &self,
        artifact: &AudioArtifact,
    ) -> Result<RecipeRecord, PipelineError> {
        let transcript = self.transcription_engine.transcribe(artifact).await?;

        if transcript.is_empty() {
            tracing::warn!(artifact_id = %artifact.id(), "Transcript is empty, extracting anyway");
        } else {
            tracing::debug!(chars = transcript.char_count(), "Transcript ready");
        }

        let recipe = self.recipe_extractor.extract(&transcript).await?;
        Ok(recipe)
    }
}

/// Turns a panic inside a stage into an unclassified error.
async fn guarded<F, T, E>(stage: F) -> Result<Result<T, E>, PipelineError>
where
    F: Future<Output = Result<T, E>>,
{
    AssertUnwindSafe(stage)
        .catch_unwind()
        .await
        .map_err(|payload| PipelineError::Unclassified(panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("internal error: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("internal error: {}", s)
    } else {
        "internal error".to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{0}")]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    Transcription(#[from] TranscriptionError),
    #[error("{0}")]
    ExtractionService(LlmClientError),
    #[error("{0}")]
    MalformedRecipe(String),
    #[error("{0}")]
    Unclassified(String),
}

impl PipelineError {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Fetch(_) => "fetch_error",
            PipelineError::Transcription(_) => "transcription_error",
            PipelineError::ExtractionService(_) => "extraction_service_error",
            PipelineError::MalformedRecipe(_) => "malformed_recipe_error",
            PipelineError::Unclassified(_) => "unclassified_error",
        }
    }
}

impl From<ExtractionError> for PipelineError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::Service(e) => PipelineError::ExtractionService(e),
            ExtractionError::MalformedRecipe(msg) => PipelineError::MalformedRecipe(msg),
        }
    }
}
