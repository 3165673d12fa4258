use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode, header};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::application::ports::{LlmClient, MediaFetcher};
use crate::infrastructure::observability::request_id_middleware;
use crate::presentation::handlers::{ErrorResponse, health_handler, recipe_handler};
use crate::presentation::state::AppState;

/// A form carrying one URL never needs more than this.
const MAX_FORM_BYTES: usize = 64 * 1024;

pub fn create_router<M, L>(state: AppState<M, L>) -> Router
where
    M: MediaFetcher + ?Sized + 'static,
    L: LlmClient + ?Sized + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let recipes = Router::new()
        .route("/youtube-to-recipe/", post(recipe_handler::<M, L>))
        .route("/youtube-to-recipe", post(recipe_handler::<M, L>))
        .route("/api/v1/recipes", post(recipe_handler::<M, L>))
        .layer(DefaultBodyLimit::max(MAX_FORM_BYTES));

    Router::new()
        .route("/health", get(health_handler))
        .merge(recipes)
        .fallback(not_found)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(trace_layer)
        .layer(cors)
        .with_state(state)
}

async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "not found".to_string(),
        }),
    )
        .into_response()
}
