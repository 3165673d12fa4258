use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};

use crate::application::ports::{FetchError, MediaFetcher};
use crate::domain::{ArtifactId, AudioArtifact, VideoUrl};
use crate::infrastructure::storage::WorkingStorage;

const FORMAT_SELECTOR: &str = "bestaudio/best";
const MAX_ERROR_CHARS: usize = 500;

/// Downloads audio with the `yt-dlp` executable and extracts it with ffmpeg.
///
/// The tool runs in its own process group so that a timeout or an abandoned
/// request also stops the ffmpeg post-processor it starts.
pub struct YtDlpFetcher {
    binary: PathBuf,
    storage: WorkingStorage,
    audio_format: String,
    timeout: Option<Duration>,
}

impl YtDlpFetcher {
    pub fn new(binary: impl Into<PathBuf>, storage: WorkingStorage, audio_format: &str) -> Self {
        Self {
            binary: binary.into(),
            storage,
            audio_format: audio_format.to_string(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn build_args(&self, url: &VideoUrl, id: &ArtifactId) -> Vec<OsString> {
        vec![
            "--no-playlist".into(),
            "--quiet".into(),
            "--no-warnings".into(),
            "--no-progress".into(),
            "-f".into(),
            FORMAT_SELECTOR.into(),
            "-x".into(),
            "--audio-format".into(),
            self.audio_format.clone().into(),
            "-o".into(),
            self.storage.output_template(id).into_os_string(),
            "--".into(),
            url.as_str().into(),
        ]
    }

    fn spawn(&self, url: &VideoUrl, id: &ArtifactId) -> Result<Child, FetchError> {
        let mut command = std::process::Command::new(&self.binary);
        command
            .args(self.build_args(url, id))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        Command::from(command)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    FetchError::ToolUnavailable(format!("{}: {}", self.binary.display(), e))
                }
                _ => FetchError::DownloadFailed(format!("spawn: {}", e)),
            })
    }

    async fn download(
        &self,
        url: &VideoUrl,
        id: &ArtifactId,
        in_flight: &mut InFlightDownload<'_>,
    ) -> Result<AudioArtifact, FetchError> {
        let mut child = self.spawn(url, id)?;
        in_flight.process_group = child.id();

        let waited = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, wait_for_exit(&mut child)).await {
                Ok(waited) => waited,
                Err(_) => {
                    in_flight.stop(&mut child).await;
                    return Err(FetchError::TimedOut(limit));
                }
            },
            None => wait_for_exit(&mut child).await,
        };
        in_flight.process_group = None;

        let (status, stderr) =
            waited.map_err(|e| FetchError::DownloadFailed(format!("wait: {}", e)))?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(FetchError::DownloadFailed(error_summary(
                &stderr,
                &status.to_string(),
            )));
        }

        let path = self.storage.artifact_path(id, &self.audio_format);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(AudioArtifact::new(*id, path)),
            Ok(_) => Err(FetchError::NoAudio(format!("{} is empty", path.display()))),
            Err(e) => Err(FetchError::NoAudio(format!("{}: {}", path.display(), e))),
        }
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &VideoUrl) -> Result<AudioArtifact, FetchError> {
        let id = ArtifactId::new();

        tracing::debug!(
            artifact_id = %id,
            binary = %self.binary.display(),
            format = %self.audio_format,
            "Starting audio download"
        );

        let mut in_flight = InFlightDownload::new(&self.storage, id);
        let result = self.download(url, &id, &mut in_flight).await;

        if let Err(e) = &result {
            match self.storage.purge(&id).await {
                Ok(0) => {}
                Ok(removed) => {
                    tracing::debug!(artifact_id = %id, removed, "Purged partial download")
                }
                Err(purge_err) => tracing::warn!(
                    artifact_id = %id,
                    error = %purge_err,
                    "Failed to purge partial download"
                ),
            }
            tracing::warn!(artifact_id = %id, error = %e, "Audio download failed");
        }

        in_flight.disarm();
        result
    }
}

/// A download that has not finished yet.
///
/// If the fetch future is dropped before `disarm`, the tool's process group
/// is killed and every file carrying the artifact id is removed.
struct InFlightDownload<'a> {
    storage: &'a WorkingStorage,
    id: ArtifactId,
    process_group: Option<u32>,
    armed: bool,
}

impl<'a> InFlightDownload<'a> {
    fn new(storage: &'a WorkingStorage, id: ArtifactId) -> Self {
        Self {
            storage,
            id,
            process_group: None,
            armed: true,
        }
    }

    /// Kills the whole group, then reaps the tool so nothing writes after
    /// the purge.
    async fn stop(&mut self, child: &mut Child) {
        if let Some(group) = self.process_group.take() {
            kill_process_group(group);
        }
        if let Err(e) = child.kill().await {
            tracing::debug!(artifact_id = %self.id, error = %e, "Download process already gone");
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlightDownload<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Some(group) = self.process_group.take() {
            kill_process_group(group);
        }
        match self.storage.purge_blocking(&self.id) {
            Ok(0) => {}
            Ok(removed) => {
                tracing::debug!(artifact_id = %self.id, removed, "Purged abandoned download")
            }
            Err(e) => tracing::warn!(
                artifact_id = %self.id,
                error = %e,
                "Failed to purge abandoned download"
            ),
        }
    }
}

/// Drains stderr to EOF before reaping so a chatty tool cannot block on a
/// full pipe.
async fn wait_for_exit(child: &mut Child) -> io::Result<(ExitStatus, Vec<u8>)> {
    let mut stderr = Vec::new();
    if let Some(mut pipe) = child.stderr.take() {
        pipe.read_to_end(&mut stderr).await?;
    }
    let status = child.wait().await?;
    Ok((status, stderr))
}

#[cfg(unix)]
fn kill_process_group(group: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(group) else {
        return;
    };
    match killpg(Pid::from_raw(raw), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(
            process_group = group,
            error = %e,
            "Failed to kill download process group"
        ),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_group: u32) {}

/// Picks the `ERROR:` lines of the tool's stderr, or its last line.
fn error_summary(stderr: &str, status: &str) -> String {
    let errors: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("ERROR"))
        .collect();

    let summary = if !errors.is_empty() {
        errors.join("; ")
    } else if let Some(last) = stderr.lines().map(str::trim).filter(|l| !l.is_empty()).last() {
        last.to_string()
    } else {
        format!("yt-dlp exited with {}", status)
    };

    if summary.chars().count() > MAX_ERROR_CHARS {
        let truncated: String = summary.chars().take(MAX_ERROR_CHARS).collect();
        format!("{}...", truncated)
    } else {
        summary
    }
}
