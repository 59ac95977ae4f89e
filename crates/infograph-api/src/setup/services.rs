//! Pipeline service wiring.

use crate::state::AppState;
use anyhow::Result;
use infograph_core::Config;
use infograph_pipeline::uploader::AssetStore;
use infograph_pipeline::{
    ChatModel, GeminiClient, ImageModel, ImageSynthesizer, MediaFetcher, PipelineOrchestrator,
    RemoteAssetUploader, ToolCallBroker, YtDlpFetcher,
};
use std::sync::Arc;

/// Build the pipeline behind the generation endpoint. Without an API key the
/// pipeline stays unbuilt and the endpoint reports itself unconfigured.
pub fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let pipeline = match &config.gemini_api_key {
        Some(api_key) => Some(Arc::new(build_pipeline(config, api_key)?)),
        None => {
            tracing::warn!(
                "GEMINI_API_KEY not set - infographic generation disabled until configured"
            );
            None
        }
    };

    Ok(Arc::new(AppState {
        config: config.clone(),
        pipeline,
    }))
}

fn build_pipeline(config: &Config, api_key: &str) -> Result<PipelineOrchestrator> {
    let gemini = Arc::new(GeminiClient::new(
        api_key,
        &config.gemini_api_base,
        &config.analysis_model,
        &config.image_model,
    )?);

    let fetcher = MediaFetcher::new(
        Arc::new(YtDlpFetcher::new(config.ytdlp_path.clone())),
        config.scratch_dir.clone(),
    );
    let uploader = RemoteAssetUploader::new(
        Arc::clone(&gemini) as Arc<dyn AssetStore>,
        config.asset_poll_interval(),
    );
    let broker = Arc::new(ToolCallBroker::new(
        Arc::clone(&gemini) as Arc<dyn ChatModel>,
        fetcher,
        uploader,
    ));
    let synthesizer = Arc::new(ImageSynthesizer::new(gemini as Arc<dyn ImageModel>));

    tracing::info!(
        analysis_model = %config.analysis_model,
        image_model = %config.image_model,
        deadline_secs = config.pipeline_deadline_secs,
        "Pipeline services initialized"
    );

    Ok(PipelineOrchestrator::new(
        broker,
        synthesizer,
        config.pipeline_deadline(),
    ))
}
