//! Wiring from configuration to running components.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::select;
use tokio::sync::Notify;
use tokio::time::Duration;
use tracing::{error, info, warn};

use common::{init_db_pool, secret_from_env, Config, ImageConfig, JobsConfig, LlmConfig};

use crate::generator::{ContentGenerator, ImageGenerator, ImageProvider, OpenAiImageProvider, StubImageProvider};
use crate::jobs::{JobStore, JobTracker, MemoryJobStore, SqliteJobStore};
use crate::llm::remote::RemoteLlmProvider;
use crate::llm::stub::StubLlmProvider;
use crate::llm::LlmProvider;
use crate::news::ArticleFetcher;
use crate::output::OutputWriter;
use crate::pipeline::Pipeline;

const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_IMAGES_URL: &str = "https://api.openai.com/v1/images/generations";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Create the text-generation provider selected by `[llm].adapter`
pub fn create_llm_provider(llm_config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    match llm_config.adapter() {
        "remote" => {
            let api_key_env = llm_config.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
            let api_key = secret_from_env(Some(api_key_env))
                .with_context(|| format!("LLM API key env var '{}' not set", api_key_env))?;

            let model = llm_config.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
            let api_url = llm_config.api_url.clone().unwrap_or_else(|| DEFAULT_CHAT_URL.to_string());

            info!(model = %model, api_url = %api_url, "LLM provider initialized: remote");
            let provider = RemoteLlmProvider::new(api_url, api_key, model).with_defaults(
                llm_config.timeout_seconds.unwrap_or(60),
                llm_config.max_tokens.unwrap_or(1000),
                llm_config.temperature.unwrap_or(0.7),
            );
            Ok(Arc::new(provider))
        }
        "stub" => {
            warn!("LLM provider initialized: stub (canned offline output)");
            Ok(Arc::new(StubLlmProvider::new()))
        }
        other => anyhow::bail!("Unknown LLM adapter type: {}", other),
    }
}

/// Create the image provider selected by `[image].adapter`
pub fn create_image_provider(image_config: &ImageConfig, llm_config: &LlmConfig) -> Result<Arc<dyn ImageProvider>> {
    match image_config.adapter() {
        "remote" => {
            // same key as the text endpoint unless configured otherwise
            let api_key_env = image_config
                .api_key_env
                .as_deref()
                .or(llm_config.api_key_env.as_deref())
                .unwrap_or(DEFAULT_API_KEY_ENV);
            let api_key = secret_from_env(Some(api_key_env))
                .with_context(|| format!("Image API key env var '{}' not set", api_key_env))?;

            let model = image_config.model.clone().unwrap_or_else(|| "dall-e-3".to_string());
            let api_url = image_config.api_url.clone().unwrap_or_else(|| DEFAULT_IMAGES_URL.to_string());

            info!(model = %model, api_url = %api_url, "image provider initialized: remote");
            let provider = OpenAiImageProvider::new(api_url, api_key, model)
                .with_timeout(image_config.timeout_seconds.unwrap_or(120));
            Ok(Arc::new(provider))
        }
        "stub" => {
            warn!("image provider initialized: stub (blank images)");
            Ok(Arc::new(StubImageProvider))
        }
        other => anyhow::bail!("Unknown image adapter type: {}", other),
    }
}

/// Open the job store selected by `[jobs].backend`
pub async fn create_job_store(jobs: &JobsConfig) -> Result<Arc<dyn JobStore>> {
    match jobs.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryJobStore::new())),
        "sqlite" => {
            let path = jobs.database_path.as_deref().unwrap_or("data/jobs.db");
            let path_abs = match tokio::fs::canonicalize(path).await {
                Ok(p) => p.to_string_lossy().to_string(),
                Err(_) => path.to_string(),
            };
            info!(db_path = %path_abs, "resolved job store DB path");

            let pool = init_db_pool(&path_abs).await?;
            let store = SqliteJobStore::new(pool)
                .await
                .context("failed to create job store schema")?;
            Ok(Arc::new(store))
        }
        other => anyhow::bail!("Unknown job store backend: {}", other),
    }
}

/// Build the whole pipeline from configuration.
pub async fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let llm = create_llm_provider(&config.llm)?;
    let image_provider = create_image_provider(&config.image, &config.llm)?;

    let fetcher = ArticleFetcher::from_config(&config.news)?;
    let writer = ContentGenerator::new(llm.clone(), &config.post);

    let mut images = ImageGenerator::new(
        image_provider,
        config.brand.clone(),
        config.image.size(),
        config.image.quality(),
    )
    .with_download_timeout(config.image.timeout_seconds.unwrap_or(120));
    if config.image.enhance_prompt.unwrap_or(true) {
        images = images.with_enhancer(llm);
    }

    let store = create_job_store(&config.jobs).await?;

    Ok(Pipeline::new(
        Arc::new(fetcher),
        Arc::new(writer),
        Arc::new(images),
        JobTracker::new(store),
        OutputWriter::new(Path::new(&config.output.dir)),
        config.generation.max_concurrency,
    ))
}

/// Periodically evict finished jobs until `shutdown_notify` fires.
pub async fn run_job_sweeper(
    tracker: JobTracker,
    jobs: JobsConfig,
    shutdown_notify: Arc<Notify>,
) -> Result<()> {
    let retention = chrono::Duration::minutes(jobs.retention_minutes as i64);
    let interval = Duration::from_secs(jobs.sweep_interval_seconds.max(1));
    info!(
        retention_minutes = jobs.retention_minutes,
        interval_seconds = interval.as_secs(),
        "sweeper: starting"
    );

    loop {
        select! {
            _ = tokio::time::sleep(interval) => {
                if let Err(e) = tracker.sweep(retention).await {
                    error!(%e, "sweeper: failed to evict expired jobs");
                }
            },
            _ = shutdown_notify.notified() => {
                info!("sweeper: shutdown requested, exiting loop");
                break;
            }
        }
    }

    Ok(())
}
