use std::io;
use std::path::{Path, PathBuf};

use crate::domain::{ArtifactId, AudioArtifact};

/// Directory holding transient per-request audio files.
///
/// Files are named `<artifact id>.<ext>`; the random id keeps concurrent
/// requests apart without locking.
#[derive(Debug, Clone)]
pub struct WorkingStorage {
    root: PathBuf,
}

impl WorkingStorage {
    /// Creates the directory if it does not exist yet.
    pub fn new(root: PathBuf) -> io::Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifact_path(&self, id: &ArtifactId, extension: &str) -> PathBuf {
        self.root.join(AudioArtifact::file_name(id, extension))
    }

    /// Output template handed to the fetch tool; it substitutes the real
    /// extension of whatever it writes.
    pub fn output_template(&self, id: &ArtifactId) -> PathBuf {
        self.root.join(format!("{}.%(ext)s", id))
    }

    /// Deletes every file whose name starts with the artifact id, including
    /// partial downloads and intermediate containers. Returns how many were
    /// removed.
    pub async fn purge(&self, id: &ArtifactId) -> io::Result<usize> {
        let prefix = id.to_string();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !name.starts_with(&prefix) {
                continue;
            }
            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }

    /// Synchronous `purge` for drop paths that cannot await.
    pub fn purge_blocking(&self, id: &ArtifactId) -> io::Result<usize> {
        let prefix = id.to_string();
        let mut removed = 0;

        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_name().to_string_lossy().starts_with(&prefix) {
                continue;
            }
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }

    /// Number of files currently in working storage.
    pub async fn file_count(&self) -> io::Result<usize> {
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        let mut count = 0;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                count += 1;
            }
        }
        Ok(count)
    }
}
