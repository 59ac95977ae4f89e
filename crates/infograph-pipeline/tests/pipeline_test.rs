//! End-to-end pipeline tests with stubbed external services.
//!
//! Every external dependency (chat model, image model, asset store, video
//! source) is injected as a stub, so these tests exercise the real
//! orchestration code paths without network access or binaries.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use infograph_core::error::PipelineError;
use infograph_core::models::{AssetState, GeneratedArtifact, RemoteAsset, VideoReference};
use infograph_pipeline::fetcher::{FetchError, MediaFetcher, VideoSource, YtDlpFetcher};
use infograph_pipeline::model::{
    ChatModel, Content, ImageModel, ModelError, Part, Role, ToolDeclaration,
};
use infograph_pipeline::uploader::{AssetStore, RemoteAssetUploader, StoreError};
use infograph_pipeline::{ImageSynthesizer, PipelineOrchestrator, ToolCallBroker};
use serde_json::json;
use tempfile::TempDir;

const TOOL_NAME: &str = "download_video";

fn video() -> VideoReference {
    VideoReference {
        id: "vid42".to_string(),
        title: "Deep Dive".to_string(),
        description: "A walkthrough".to_string(),
        thumbnail_url: None,
        collection_title: Some("Tutorials".to_string()),
    }
}

fn model_text(text: &str) -> Content {
    Content {
        role: Role::Model,
        parts: vec![Part::Text(text.to_string())],
    }
}

fn model_tool_call(url: &str) -> Content {
    Content {
        role: Role::Model,
        parts: vec![Part::FunctionCall {
            name: TOOL_NAME.to_string(),
            args: json!({ "url": url }),
        }],
    }
}

/// Chat model that replays a scripted list of replies.
struct ScriptedChat {
    replies: Mutex<Vec<Content>>,
}

impl ScriptedChat {
    fn new(mut replies: Vec<Content>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
        })
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn send(
        &self,
        _history: &[Content],
        _tools: &[ToolDeclaration],
    ) -> Result<Content, ModelError> {
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop()
            .expect("unexpected extra model call"))
    }
}

/// Image model that echoes the prompt length into the artifact bytes so
/// tests can tell runs apart.
struct StubImage {
    bytes: Vec<u8>,
}

#[async_trait]
impl ImageModel for StubImage {
    async fn generate_image(&self, _prompt: &str) -> Result<GeneratedArtifact, ModelError> {
        Ok(GeneratedArtifact {
            bytes: self.bytes.clone(),
            mime_type: "image/png".to_string(),
        })
    }
}

struct RecordingSource {
    urls: Mutex<Vec<String>>,
}

impl RecordingSource {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            urls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl VideoSource for RecordingSource {
    async fn download(&self, url: &str, dest: &Path) -> Result<(), FetchError> {
        self.urls.lock().unwrap().push(url.to_string());
        tokio::fs::write(dest, b"stub video").await?;
        Ok(())
    }
}

/// Store that needs `pending_polls` status checks before reporting Ready.
struct PollingStore {
    pending_polls: usize,
    polls: AtomicUsize,
}

impl PollingStore {
    fn ready_after(pending_polls: usize) -> Arc<Self> {
        Arc::new(Self {
            pending_polls,
            polls: AtomicUsize::new(0),
        })
    }

    fn asset(state: AssetState) -> RemoteAsset {
        RemoteAsset {
            name: "files/stub".to_string(),
            uri: "https://store.example/files/stub".to_string(),
            mime_type: "video/mp4".to_string(),
            state,
        }
    }
}

#[async_trait]
impl AssetStore for PollingStore {
    async fn upload(
        &self,
        _data: Vec<u8>,
        _mime: &str,
        _name: &str,
    ) -> Result<RemoteAsset, StoreError> {
        Ok(Self::asset(AssetState::Pending))
    }

    async fn get_state(&self, _name: &str) -> Result<RemoteAsset, StoreError> {
        let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if n > self.pending_polls {
            Ok(Self::asset(AssetState::Ready))
        } else {
            Ok(Self::asset(AssetState::Pending))
        }
    }
}

fn orchestrator(
    chat: Arc<dyn ChatModel>,
    image: Arc<dyn ImageModel>,
    source: Arc<dyn VideoSource>,
    store: Arc<dyn AssetStore>,
    scratch_dir: &Path,
    deadline: Duration,
) -> PipelineOrchestrator {
    let fetcher = MediaFetcher::new(source, scratch_dir.to_path_buf());
    let uploader = RemoteAssetUploader::new(store, Duration::from_secs(2));
    let broker = Arc::new(ToolCallBroker::new(chat, fetcher, uploader));
    let synthesizer = Arc::new(ImageSynthesizer::new(image));
    PipelineOrchestrator::new(broker, synthesizer, deadline)
}

#[tokio::test(start_paused = true)]
async fn test_full_run_produces_image_bytes() {
    let dir = TempDir::new().unwrap();
    let chat = ScriptedChat::new(vec![
        model_tool_call("https://www.youtube.com/watch?v=vid42"),
        model_text("Bold palette, three sections."),
    ]);
    let pipeline = orchestrator(
        chat,
        Arc::new(StubImage {
            bytes: vec![9, 9, 9],
        }),
        RecordingSource::new(),
        PollingStore::ready_after(3),
        dir.path(),
        Duration::from_secs(300),
    );

    let artifact = pipeline.run(video()).await.unwrap();
    assert_eq!(artifact.bytes, vec![9, 9, 9]);
    assert_eq!(artifact.mime_type, "image/png");
    assert!(artifact.data_uri().starts_with("data:image/png;base64,"));
}

#[tokio::test(start_paused = true)]
async fn test_scratch_dir_empty_after_successful_run() {
    let dir = TempDir::new().unwrap();
    let chat = ScriptedChat::new(vec![
        model_tool_call("https://www.youtube.com/watch?v=vid42"),
        model_text("analysis"),
    ]);
    let pipeline = orchestrator(
        chat,
        Arc::new(StubImage { bytes: vec![1] }),
        RecordingSource::new(),
        PollingStore::ready_after(1),
        dir.path(),
        Duration::from_secs(300),
    );

    pipeline.run(video()).await.unwrap();
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(entries.is_empty(), "scratch files must not outlive the run");
}

#[tokio::test(start_paused = true)]
async fn test_text_only_model_skips_download_entirely() {
    let dir = TempDir::new().unwrap();
    let source = RecordingSource::new();
    let chat = ScriptedChat::new(vec![model_text("Analysis without watching.")]);
    let pipeline = orchestrator(
        chat,
        Arc::new(StubImage { bytes: vec![7] }),
        source.clone(),
        PollingStore::ready_after(0),
        dir.path(),
        Duration::from_secs(300),
    );

    let artifact = pipeline.run(video()).await.unwrap();
    assert_eq!(artifact.bytes, vec![7]);
    assert!(source.urls.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_download_honors_model_supplied_url() {
    let dir = TempDir::new().unwrap();
    let source = RecordingSource::new();
    let chat = ScriptedChat::new(vec![
        model_tool_call("https://www.youtube.com/watch?v=other-id"),
        model_text("analysis"),
    ]);
    let pipeline = orchestrator(
        chat,
        Arc::new(StubImage { bytes: vec![1] }),
        source.clone(),
        PollingStore::ready_after(0),
        dir.path(),
        Duration::from_secs(300),
    );

    pipeline.run(video()).await.unwrap();
    assert_eq!(
        source.urls.lock().unwrap().as_slice(),
        ["https://www.youtube.com/watch?v=other-id"]
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_exceeded_mid_poll_returns_timeout_and_cleans_scratch() {
    /// Store whose asset never leaves Pending.
    struct StuckStore;

    #[async_trait]
    impl AssetStore for StuckStore {
        async fn upload(
            &self,
            _data: Vec<u8>,
            _mime: &str,
            _name: &str,
        ) -> Result<RemoteAsset, StoreError> {
            Ok(PollingStore::asset(AssetState::Pending))
        }

        async fn get_state(&self, _name: &str) -> Result<RemoteAsset, StoreError> {
            Ok(PollingStore::asset(AssetState::Pending))
        }
    }

    let dir = TempDir::new().unwrap();
    let chat = ScriptedChat::new(vec![model_tool_call(
        "https://www.youtube.com/watch?v=vid42",
    )]);
    let pipeline = orchestrator(
        chat,
        Arc::new(StubImage { bytes: vec![1] }),
        RecordingSource::new(),
        Arc::new(StuckStore),
        dir.path(),
        Duration::from_secs(30),
    );

    let err = pipeline.run(video()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Timeout(30)));
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(
        entries.is_empty(),
        "aborted run must not leak scratch files"
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_exceeded_during_hung_upload_cleans_scratch() {
    /// Store whose upload RPC never completes; the scratch guard is alive
    /// across the hang and must be dropped by the abort.
    struct HangingStore;

    #[async_trait]
    impl AssetStore for HangingStore {
        async fn upload(
            &self,
            _data: Vec<u8>,
            _mime: &str,
            _name: &str,
        ) -> Result<RemoteAsset, StoreError> {
            std::future::pending().await
        }

        async fn get_state(&self, _name: &str) -> Result<RemoteAsset, StoreError> {
            unreachable!("upload never completes")
        }
    }

    let dir = TempDir::new().unwrap();
    let chat = ScriptedChat::new(vec![model_tool_call(
        "https://www.youtube.com/watch?v=vid42",
    )]);
    let pipeline = orchestrator(
        chat,
        Arc::new(StubImage { bytes: vec![1] }),
        RecordingSource::new(),
        Arc::new(HangingStore),
        dir.path(),
        Duration::from_secs(10),
    );

    let err = pipeline.run(video()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Timeout(10)));
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(entries.is_empty());
}

// Real child process, real time: the downloader must die with the aborted
// run instead of finishing in the background and writing the scratch file
// after the guard has cleaned up.
#[cfg(unix)]
#[tokio::test]
async fn test_deadline_abort_kills_in_flight_downloader() {
    use std::os::unix::fs::PermissionsExt;

    let bin_dir = TempDir::new().unwrap();
    let scratch_dir = TempDir::new().unwrap();

    // Fake downloader: waits, then writes its -o destination like the real
    // binary would.
    let script = bin_dir.path().join("slow-downloader.sh");
    std::fs::write(
        &script,
        "#!/bin/sh\n\
         while [ $# -gt 0 ] && [ \"$1\" != \"-o\" ]; do shift; done\n\
         dest=\"$2\"\n\
         sleep 1\n\
         echo data > \"$dest\"\n",
    )
    .unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let chat = ScriptedChat::new(vec![model_tool_call(
        "https://www.youtube.com/watch?v=vid42",
    )]);
    let fetcher = MediaFetcher::new(
        Arc::new(YtDlpFetcher::new(script.to_string_lossy().into_owned())),
        scratch_dir.path().to_path_buf(),
    );
    let uploader = RemoteAssetUploader::new(PollingStore::ready_after(0), Duration::from_secs(2));
    let broker = Arc::new(ToolCallBroker::new(chat, fetcher, uploader));
    let synthesizer = Arc::new(ImageSynthesizer::new(Arc::new(StubImage { bytes: vec![1] })));
    let pipeline = PipelineOrchestrator::new(broker, synthesizer, Duration::from_millis(200));

    let err = pipeline.run(video()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Timeout(_)));

    // Give an orphaned child time to write if the kill did not take.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let leftovers: Vec<_> = std::fs::read_dir(scratch_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert!(
        leftovers.is_empty(),
        "aborted download leaked scratch files: {:?}",
        leftovers
    );
}

#[tokio::test(start_paused = true)]
async fn test_fetch_failure_maps_to_unresolvable() {
    struct PrivateSource;

    #[async_trait]
    impl VideoSource for PrivateSource {
        async fn download(&self, url: &str, _dest: &Path) -> Result<(), FetchError> {
            Err(FetchError::Unresolvable {
                url: url.to_string(),
                detail: "video is private".to_string(),
            })
        }
    }

    let dir = TempDir::new().unwrap();
    let chat = ScriptedChat::new(vec![model_tool_call(
        "https://www.youtube.com/watch?v=vid42",
    )]);
    let pipeline = orchestrator(
        chat,
        Arc::new(StubImage { bytes: vec![1] }),
        Arc::new(PrivateSource),
        PollingStore::ready_after(0),
        dir.path(),
        Duration::from_secs(300),
    );

    let err = pipeline.run(video()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Unresolvable(_)));
}

#[tokio::test(start_paused = true)]
async fn test_failed_asset_processing_maps_to_processing_failed() {
    struct FailingStore;

    #[async_trait]
    impl AssetStore for FailingStore {
        async fn upload(
            &self,
            _data: Vec<u8>,
            _mime: &str,
            _name: &str,
        ) -> Result<RemoteAsset, StoreError> {
            Ok(PollingStore::asset(AssetState::Pending))
        }

        async fn get_state(&self, _name: &str) -> Result<RemoteAsset, StoreError> {
            Ok(PollingStore::asset(AssetState::Failed))
        }
    }

    let dir = TempDir::new().unwrap();
    let chat = ScriptedChat::new(vec![model_tool_call(
        "https://www.youtube.com/watch?v=vid42",
    )]);
    let pipeline = orchestrator(
        chat,
        Arc::new(StubImage { bytes: vec![1] }),
        RecordingSource::new(),
        Arc::new(FailingStore),
        dir.path(),
        Duration::from_secs(300),
    );

    let err = pipeline.run(video()).await.unwrap_err();
    assert!(matches!(err, PipelineError::ProcessingFailed(_)));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_runs_stay_independent() {
    let dir = TempDir::new().unwrap();

    let make_pipeline = |bytes: Vec<u8>| {
        let chat = ScriptedChat::new(vec![
            model_tool_call("https://www.youtube.com/watch?v=vid42"),
            model_text("analysis"),
        ]);
        orchestrator(
            chat,
            Arc::new(StubImage { bytes }),
            RecordingSource::new(),
            PollingStore::ready_after(2),
            dir.path(),
            Duration::from_secs(300),
        )
    };

    let a = make_pipeline(vec![1, 1]);
    let b = make_pipeline(vec![2, 2]);

    let (ra, rb) = tokio::join!(a.run(video()), b.run(video()));
    assert_eq!(ra.unwrap().bytes, vec![1, 1]);
    assert_eq!(rb.unwrap().bytes, vec![2, 2]);
    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert!(entries.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_panic_inside_run_is_contained() {
    struct PanickingChat;

    #[async_trait]
    impl ChatModel for PanickingChat {
        async fn send(
            &self,
            _history: &[Content],
            _tools: &[ToolDeclaration],
        ) -> Result<Content, ModelError> {
            panic!("stub blew up");
        }
    }

    let dir = TempDir::new().unwrap();
    let pipeline = orchestrator(
        Arc::new(PanickingChat),
        Arc::new(StubImage { bytes: vec![1] }),
        RecordingSource::new(),
        PollingStore::ready_after(0),
        dir.path(),
        Duration::from_secs(300),
    );

    let err = pipeline.run(video()).await.unwrap_err();
    assert!(matches!(err, PipelineError::Internal(_)));
}
