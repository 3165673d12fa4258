mod artifact_guard;
mod recipe_extractor;
mod recipe_pipeline;

pub use artifact_guard::ArtifactGuard;
pub use recipe_extractor::{ExtractionError, RecipeExtractor, build_prompt, parse_recipe};
pub use recipe_pipeline::{PipelineError, RecipePipeline};
