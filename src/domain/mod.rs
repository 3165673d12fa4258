mod artifact_id;
mod audio_artifact;
mod recipe;
mod transcript;
mod video_url;

pub use artifact_id::ArtifactId;
pub use audio_artifact::AudioArtifact;
pub use recipe::{RecipeFieldError, RecipeRecord};
pub use transcript::Transcript;
pub use video_url::{VideoUrl, VideoUrlError};
