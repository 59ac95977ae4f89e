//! Video download stage: resolve a source URL to a local scratch file.
//!
//! The production [`VideoSource`] shells out to yt-dlp at a configured path,
//! pinned to a single low-bitrate quality tier: higher fidelity buys nothing
//! for analysis and slows the download.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use uuid::Uuid;

/// Preferred format: itag 18 (mp4, ~360p), falling back to the worst mp4.
const FORMAT_SELECTOR: &str = "18/worst[ext=mp4]/worst";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("could not resolve video at {url}: {detail}")]
    Unresolvable { url: String, detail: String },

    #[error("scratch file error: {0}")]
    Io(#[from] std::io::Error),
}

/// A transient local file bridging the download and upload steps.
///
/// The scratch file is removed exactly once: [`ScratchFile::remove`] consumes
/// the guard, and `Drop` is the backstop for paths abandoned mid-pipeline
/// (errors, deadline aborts). Concurrent runs never share a path, so removal
/// cannot touch another run's file.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
    removed: bool,
}

impl ScratchFile {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self {
            path,
            removed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Delete the scratch file. Consumes the guard so deletion cannot be
    /// attempted twice.
    pub fn remove(mut self) -> std::io::Result<()> {
        self.removed = true;
        std::fs::remove_file(&self.path)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if !self.removed {
            if let Err(err) = std::fs::remove_file(&self.path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %err,
                        "Failed to clean up scratch file"
                    );
                }
            }
        }
    }
}

/// A source that can materialize a video URL as a local file.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Download the video at `url` into `dest`. On success `dest` is a
    /// complete, closed file.
    async fn download(&self, url: &str, dest: &Path) -> Result<(), FetchError>;
}

/// Production video source backed by the yt-dlp binary.
pub struct YtDlpFetcher {
    binary_path: String,
}

impl YtDlpFetcher {
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

#[async_trait]
impl VideoSource for YtDlpFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        tracing::info!(url = %url, dest = %dest.display(), "Downloading video");

        // kill_on_drop: a deadline abort drops this future mid-download; the
        // child must die with it or it would write the scratch file after
        // the guard has already cleaned up.
        let output = Command::new(&self.binary_path)
            .arg("--no-playlist")
            .arg("--quiet")
            .arg("-f")
            .arg(FORMAT_SELECTOR)
            .arg("-o")
            .arg(dest)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Unresolvable {
                url: url.to_string(),
                detail: stderr.trim().to_string(),
            });
        }

        // yt-dlp can exit 0 without writing anything for some URL shapes.
        let metadata = tokio::fs::metadata(dest).await.map_err(|_| {
            FetchError::Unresolvable {
                url: url.to_string(),
                detail: "downloader produced no output file".to_string(),
            }
        })?;
        if metadata.len() == 0 {
            return Err(FetchError::Unresolvable {
                url: url.to_string(),
                detail: "downloaded file is empty".to_string(),
            });
        }

        tracing::info!(
            url = %url,
            size_bytes = metadata.len(),
            "Video downloaded"
        );
        Ok(())
    }
}

/// Resolves a video URL into a [`ScratchFile`], choosing a collision-free
/// scratch path derived from the video identifier plus a run-unique suffix.
pub struct MediaFetcher {
    source: std::sync::Arc<dyn VideoSource>,
    scratch_dir: PathBuf,
}

impl MediaFetcher {
    pub fn new(source: std::sync::Arc<dyn VideoSource>, scratch_dir: PathBuf) -> Self {
        Self {
            source,
            scratch_dir,
        }
    }

    /// Download `url` into a fresh scratch file. The caller owns the
    /// returned guard and with it the file's lifetime.
    pub async fn fetch(&self, url: &str) -> Result<ScratchFile, FetchError> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;

        let video_id = extract_video_id(url);
        let filename = format!("{}-{}.mp4", video_id, Uuid::new_v4());
        let dest = self.scratch_dir.join(filename);

        let scratch = ScratchFile::new(dest);
        self.source.download(url, scratch.path()).await?;
        Ok(scratch)
    }
}

/// Best-effort video id extraction for scratch naming. Falls back to a
/// constant; uniqueness comes from the run suffix, not the id.
fn extract_video_id(url: &str) -> String {
    let candidate = url
        .split_once("v=")
        .map(|(_, rest)| rest.split('&').next().unwrap_or(rest))
        .or_else(|| url.rsplit('/').next().filter(|s| !s.is_empty()))
        .unwrap_or("video");

    let sanitized: String = candidate
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .take(32)
        .collect();

    if sanitized.is_empty() {
        "video".to_string()
    } else {
        sanitized
    }
}
