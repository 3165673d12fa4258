use axum::extract::{FromRequest, Multipart, Request, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::application::ports::{FetchError, LlmClient, LlmClientError, MediaFetcher};
use crate::application::services::PipelineError;
use crate::domain::RecipeRecord;
use crate::presentation::state::AppState;

const URL_FIELD: &str = "url";

#[derive(Debug, Deserialize)]
pub struct RecipeRequest {
    #[serde(default)]
    pub url: String,
}

/// Success body. Field order is part of the contract.
#[derive(Debug, Serialize)]
pub struct RecipeResponse {
    pub recipe_name: String,
    pub estimated_time: String,
    pub cuisine_type: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

impl From<RecipeRecord> for RecipeResponse {
    fn from(recipe: RecipeRecord) -> Self {
        Self {
            recipe_name: recipe.recipe_name,
            estimated_time: recipe.estimated_time,
            cuisine_type: recipe.cuisine_type,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

#[tracing::instrument(skip(state, request))]
pub async fn recipe_handler<M, L>(
    State(state): State<AppState<M, L>>,
    request: Request,
) -> Response
where
    M: MediaFetcher + ?Sized + 'static,
    L: LlmClient + ?Sized + 'static,
{
    let url = match read_url_field(request).await {
        Ok(url) => url,
        Err((status, message)) => {
            tracing::warn!(
                status = status.as_u16(),
                error = %message,
                "Rejected recipe request"
            );
            return error_response(status, message);
        }
    };

    match state.pipeline.handle(&url).await {
        Ok(recipe) => (StatusCode::OK, Json(RecipeResponse::from(recipe))).into_response(),
        Err(e) => {
            let status = error_status(&e, state.differentiate_error_status);
            tracing::error!(
                kind = e.kind(),
                status = status.as_u16(),
                error = %e,
                "Recipe request failed"
            );
            error_response(status, e.to_string())
        }
    }
}

/// Reads the `url` field from a urlencoded or multipart form body.
async fn read_url_field(request: Request) -> Result<String, (StatusCode, String)> {
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    let url = if is_multipart {
        let mut multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| (e.status(), e.body_text()))?;
        let mut found = None;
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| (e.status(), e.body_text()))?
        {
            if field.name() == Some(URL_FIELD) {
                found = Some(field.text().await.map_err(|e| (e.status(), e.body_text()))?);
                break;
            }
        }
        found.unwrap_or_default()
    } else {
        let Form(form) = Form::<RecipeRequest>::from_request(request, &())
            .await
            .map_err(|e| (e.status(), e.body_text()))?;
        form.url
    };

    let url = url.trim().to_string();
    if url.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Missing required form field `url`".to_string(),
        ));
    }
    Ok(url)
}

/// Uniform 500 unless differentiation is enabled.
pub fn error_status(error: &PipelineError, differentiate: bool) -> StatusCode {
    if !differentiate {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    match error {
        PipelineError::Fetch(FetchError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
        PipelineError::Fetch(FetchError::TimedOut(_)) => StatusCode::GATEWAY_TIMEOUT,
        PipelineError::Fetch(FetchError::Storage(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        PipelineError::Fetch(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Transcription(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PipelineError::ExtractionService(LlmClientError::RateLimited) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        PipelineError::ExtractionService(_) => StatusCode::BAD_GATEWAY,
        PipelineError::MalformedRecipe(_) => StatusCode::BAD_GATEWAY,
        PipelineError::Unclassified(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
