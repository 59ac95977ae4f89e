//! Remote asset upload stage: push scratch bytes to the asset store and
//! poll until the store reports the asset processed.
//!
//! The poll loop has no internal attempt cap; the orchestrator's run
//! deadline is the only bound. Between polls the task suspends on the
//! tokio timer, so a slow remote never parks a thread.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use infograph_core::models::{AssetState, RemoteAsset};
use thiserror::Error;
use tokio::time::sleep;

use crate::fetcher::ScratchFile;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("asset store API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("asset store protocol error: {0}")]
    Protocol(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload transport failure: {0}")]
    TransportFailure(String),

    #[error("remote asset processing failed: {0}")]
    ProcessingFailed(String),

    /// Local scratch file could not be read; no upstream was involved.
    #[error("reading scratch file: {0}")]
    Scratch(#[from] std::io::Error),
}

impl From<StoreError> for UploadError {
    fn from(err: StoreError) -> Self {
        UploadError::TransportFailure(err.to_string())
    }
}

/// Remote store for binary assets: upload, then status-poll by resource
/// name until the asset leaves its pending state.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(
        &self,
        data: Vec<u8>,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteAsset, StoreError>;

    async fn get_state(&self, name: &str) -> Result<RemoteAsset, StoreError>;
}

/// Uploads a scratch file and blocks (cooperatively) until the asset is
/// ready for use by the model.
pub struct RemoteAssetUploader {
    store: Arc<dyn AssetStore>,
    poll_interval: Duration,
}

impl RemoteAssetUploader {
    pub fn new(store: Arc<dyn AssetStore>, poll_interval: Duration) -> Self {
        Self {
            store,
            poll_interval,
        }
    }

    /// Upload the scratch bytes and await the `Ready` state.
    ///
    /// The scratch file is removed exactly once, as soon as the upload RPC
    /// has completed, whether it succeeded or not; by then the local bytes
    /// are no longer needed on any path.
    pub async fn upload_and_await_ready(
        &self,
        scratch: ScratchFile,
        mime_type: &str,
        display_name: &str,
    ) -> Result<RemoteAsset, UploadError> {
        let data = scratch.read().await?;
        let size_bytes = data.len();

        tracing::info!(
            size_bytes,
            mime_type,
            display_name,
            "Uploading media to remote asset store"
        );

        let upload_result = self.store.upload(data, mime_type, display_name).await;

        if let Err(err) = scratch.remove() {
            tracing::warn!(error = %err, "Failed to remove scratch file after upload");
        }

        let mut asset = upload_result?;

        loop {
            match asset.state {
                AssetState::Ready => {
                    tracing::info!(uri = %asset.uri, "Remote asset ready");
                    return Ok(asset);
                }
                AssetState::Failed => {
                    return Err(UploadError::ProcessingFailed(format!(
                        "asset {} entered failed state",
                        asset.name
                    )));
                }
                AssetState::Pending => {
                    tracing::debug!(name = %asset.name, "Remote asset still processing");
                    sleep(self.poll_interval).await;
                    asset = self.store.get_state(&asset.name).await?;
                }
            }
        }
    }
}
