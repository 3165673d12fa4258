use std::io;

use crate::domain::AudioArtifact;

/// Removes an audio artifact when the request that owns it ends.
///
/// `release` deletes asynchronously on the normal path. If the owning future
/// is dropped first, `Drop` deletes synchronously.
pub struct ArtifactGuard {
    artifact: AudioArtifact,
    released: bool,
}

impl ArtifactGuard {
    pub fn new(artifact: AudioArtifact) -> Self {
        Self {
            artifact,
            released: false,
        }
    }

    pub fn artifact(&self) -> &AudioArtifact {
        &self.artifact
    }

    pub async fn release(mut self) {
        let result = tokio::fs::remove_file(self.artifact.path()).await;
        log_removal(&self.artifact, result);
        self.released = true;
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let result = std::fs::remove_file(self.artifact.path());
        log_removal(&self.artifact, result);
    }
}

fn log_removal(artifact: &AudioArtifact, result: io::Result<()>) {
    match result {
        Ok(()) => {
            tracing::debug!(artifact_id = %artifact.id(), "Audio artifact removed");
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(artifact_id = %artifact.id(), "Audio artifact already gone");
        }
        Err(e) => {
            tracing::warn!(
                artifact_id = %artifact.id(),
                path = %artifact.path().display(),
                error = %e,
                "Failed to remove audio artifact"
            );
        }
    }
}
