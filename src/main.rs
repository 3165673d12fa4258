use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use recipe_scribe::application::ports::SamplingParams;
use recipe_scribe::application::services::{RecipeExtractor, RecipePipeline};
use recipe_scribe::infrastructure::audio::TranscriptionEngineFactory;
use recipe_scribe::infrastructure::llm::create_llm_client;
use recipe_scribe::infrastructure::media::YtDlpFetcher;
use recipe_scribe::infrastructure::observability::{TracingConfig, init_tracing};
use recipe_scribe::infrastructure::storage::WorkingStorage;
use recipe_scribe::presentation::{AppState, Environment, Settings, create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env().map_err(anyhow::Error::msg)?;
    let settings = Settings::load(environment).context("Failed to load settings")?;

    init_tracing(
        TracingConfig::new(environment, settings.logging.json_format),
        settings.server.port,
    );

    let storage = WorkingStorage::new(settings.media.working_dir.clone()).with_context(|| {
        format!(
            "Failed to create working directory {}",
            settings.media.working_dir.display()
        )
    })?;
    tracing::info!(working_dir = %storage.root().display(), "Working storage ready");

    let mut fetcher = YtDlpFetcher::new(
        settings.media.yt_dlp_path.clone(),
        storage,
        &settings.media.audio_format,
    );
    if let Some(timeout) = settings.media.download_timeout() {
        fetcher = fetcher.with_timeout(timeout);
    }

    let llm_client =
        Arc::new(create_llm_client(&settings.llm).context("Failed to create LLM client")?);

    let transcription = settings.transcription.clone();
    let transcription_engine = tokio::task::spawn_blocking({
        let transcription = transcription.clone();
        move || TranscriptionEngineFactory::create(&transcription)
    })
    .await
    .context("Transcription engine initialization panicked")?
    .context("Failed to initialize transcription engine")?;
    tracing::info!(
        provider = ?transcription.provider,
        model = %transcription.model,
        "Transcription engine ready"
    );

    let recipe_extractor = RecipeExtractor::new(
        llm_client,
        SamplingParams {
            temperature: settings.llm.temperature,
            max_tokens: settings.llm.max_tokens,
        },
    );

    let pipeline = Arc::new(RecipePipeline::new(
        Arc::new(fetcher),
        transcription_engine,
        recipe_extractor,
    ));

    let state =
        AppState::new(pipeline).with_differentiated_errors(settings.server.differentiate_error_status);
    let router = create_router(state);

    let addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .context("Invalid server host/port")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
