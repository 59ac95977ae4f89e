//! Configuration module
//!
//! All configuration comes from the environment (with `.env` support via
//! dotenvy). `GEMINI_API_KEY` is optional at load time so the server can
//! start and report a structured "unconfigured" error instead of crashing;
//! everything else has a sensible default.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_DEADLINE_SECS: u64 = 300;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 2;
const DEFAULT_ANALYSIS_MODEL: &str = "models/gemini-3-pro-preview";
const DEFAULT_IMAGE_MODEL: &str = "models/gemini-3-pro-image-preview";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    /// Absent means the generation endpoint answers with a structured
    /// SERVICE_UNCONFIGURED error; no network call is ever attempted.
    pub gemini_api_key: Option<String>,
    pub gemini_api_base: String,
    pub analysis_model: String,
    pub image_model: String,
    /// Path to the yt-dlp binary used to resolve video URLs to local bytes.
    pub ytdlp_path: String,
    /// Directory for transient download scratch files.
    pub scratch_dir: PathBuf,
    /// Hard wall-clock budget for one pipeline run, downloads and polling
    /// included.
    pub pipeline_deadline_secs: u64,
    /// Fixed interval between remote asset status polls.
    pub asset_poll_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            gemini_api_key: env::var("GEMINI_API_KEY").ok().filter(|s| !s.is_empty()),
            gemini_api_base: env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE.to_string()),
            analysis_model: env::var("ANALYSIS_MODEL")
                .unwrap_or_else(|_| DEFAULT_ANALYSIS_MODEL.to_string()),
            image_model: env::var("IMAGE_MODEL")
                .unwrap_or_else(|_| DEFAULT_IMAGE_MODEL.to_string()),
            ytdlp_path: env::var("YTDLP_PATH").unwrap_or_else(|_| "yt-dlp".to_string()),
            scratch_dir: env::var("SCRATCH_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            pipeline_deadline_secs: env::var("PIPELINE_DEADLINE_SECS")
                .unwrap_or_else(|_| DEFAULT_DEADLINE_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_DEADLINE_SECS),
            asset_poll_interval_secs: env::var("ASSET_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn pipeline_deadline(&self) -> Duration {
        Duration::from_secs(self.pipeline_deadline_secs)
    }

    pub fn asset_poll_interval(&self) -> Duration {
        Duration::from_secs(self.asset_poll_interval_secs)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if self.pipeline_deadline_secs == 0 {
            return Err(anyhow::anyhow!(
                "PIPELINE_DEADLINE_SECS must be greater than zero"
            ));
        }

        if self.asset_poll_interval_secs == 0 {
            return Err(anyhow::anyhow!(
                "ASSET_POLL_INTERVAL_SECS must be greater than zero"
            ));
        }

        if !self.gemini_api_base.starts_with("http://")
            && !self.gemini_api_base.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "GEMINI_API_BASE must be an http(s) URL"
            ));
        }

        Ok(())
    }
}
