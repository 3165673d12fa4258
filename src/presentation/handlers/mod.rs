mod health;
mod recipe;

pub use health::health_handler;
pub use recipe::{ErrorResponse, RecipeRequest, RecipeResponse, error_status, recipe_handler};
