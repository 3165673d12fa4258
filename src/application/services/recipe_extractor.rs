use std::sync::Arc;

use serde_json::Value;

use crate::application::ports::{LlmClient, LlmClientError, SamplingParams};
use crate::domain::{RecipeRecord, Transcript};

const PROMPT_HEADER: &str = "You extract recipes from cooking video transcripts. \
Read the transcript below and pull out a clean, structured recipe:

- the recipe name
- the ingredients, one list item per ingredient with its quantity when spoken
- the instructions, one list item per step, in the order they are performed
- the estimated total time, only if it is mentioned
- the cuisine type, only if it is clear

Transcript:";

const PROMPT_FOOTER: &str = "Reply with ONLY a JSON object, no markdown and no commentary, \
using exactly this shape:
{
  \"recipe_name\": \"\",
  \"ingredients\": [\"\", \"\"],
  \"instructions\": [\"\", \"\"],
  \"estimated_time\": \"\",
  \"cuisine_type\": \"\"
}
Use an empty string or an empty list for anything the transcript does not cover.";

pub struct RecipeExtractor<L: ?Sized>
where
    L: LlmClient,
{
    llm_client: Arc<L>,
    sampling: SamplingParams,
}

impl<L: ?Sized> RecipeExtractor<L>
where
    L: LlmClient,
{
    pub fn new(llm_client: Arc<L>, sampling: SamplingParams) -> Self {
        Self {
            llm_client,
            sampling,
        }
    }

    pub fn sampling(&self) -> &SamplingParams {
        &self.sampling
    }

    /// One completion call, no retry. Service failures and unparseable
    /// replies are reported as different errors.
    pub async fn extract(&self, transcript: &Transcript) -> Result<RecipeRecord, ExtractionError> {
        let prompt = build_prompt(transcript);

        tracing::debug!(
            prompt_chars = prompt.len(),
            temperature = self.sampling.temperature,
            "Requesting recipe completion"
        );

        let reply = self.llm_client.complete(&prompt, &self.sampling).await?;

        let recipe = parse_recipe(&reply)?;

        tracing::info!(
            recipe_name = %recipe.recipe_name,
            ingredients = recipe.ingredients.len(),
            instructions = recipe.instructions.len(),
            "Recipe extracted"
        );

        Ok(recipe)
    }
}

/// Embeds the transcript verbatim between fixed instructions.
pub fn build_prompt(transcript: &Transcript) -> String {
    format!(
        "{}\n\"\"\"{}\"\"\"\n\n{}",
        PROMPT_HEADER,
        transcript.as_str(),
        PROMPT_FOOTER
    )
}

/// Strict parse: the whole reply, modulo surrounding whitespace, must be one
/// JSON object.
pub fn parse_recipe(reply: &str) -> Result<RecipeRecord, ExtractionError> {
    let value: Value = serde_json::from_str(reply.trim())
        .map_err(|e| ExtractionError::MalformedRecipe(format!("reply is not valid JSON: {}", e)))?;

    let object = value.as_object().ok_or_else(|| {
        ExtractionError::MalformedRecipe("reply is not a JSON object".to_string())
    })?;

    RecipeRecord::from_json_object(object)
        .map_err(|e| ExtractionError::MalformedRecipe(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("completion service error: {0}")]
    Service(#[from] LlmClientError),
    #[error("malformed recipe: {0}")]
    MalformedRecipe(String),
}
