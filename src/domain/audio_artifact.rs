use std::path::{Path, PathBuf};

use super::artifact_id::ArtifactId;

/// An audio file in working storage, owned by exactly one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    id: ArtifactId,
    path: PathBuf,
}

impl AudioArtifact {
    pub fn new(id: ArtifactId, path: PathBuf) -> Self {
        Self { id, path }
    }

    pub fn id(&self) -> ArtifactId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for an artifact with the given id and audio extension.
    pub fn file_name(id: &ArtifactId, extension: &str) -> String {
        format!("{}.{}", id, extension)
    }
}
