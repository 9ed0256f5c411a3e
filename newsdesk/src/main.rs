/*
newsdesk - single-binary main.rs
This binary starts the Rocket HTTP server and the job sweeper inside the same process,
or runs a one-shot generation with --generate.
*/

use anyhow::Result;
use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newsdesk::app::{build_pipeline, run_job_sweeper};
use newsdesk::models::GenerateRequest;
use newsdesk::server::{launch_rocket, AppState};

#[derive(Parser, Debug)]
#[command(name = "newsdesk", about = "Turns AI and talent news into social posts with images")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Generate N posts, save them to the output directory and exit (no HTTP server)
    #[arg(long, value_name = "N")]
    generate: Option<i64>,

    /// Recency window in days for --generate
    #[arg(long, default_value_t = 7)]
    days: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // API keys may live in a .env file next to the config
    if let Ok(path) = dotenv::dotenv() {
        info!(path = ?path, "environment loaded from .env");
    }

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    // Load configuration with defaults
    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(%e, "failed to load configuration");
            return Err(e);
        }
    };
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    let pipeline = match build_pipeline(&config).await {
        Ok(p) => p,
        Err(e) => {
            error!("failed to initialize pipeline: {:#}", e);
            return Err(e);
        }
    };

    if let Some(count) = args.generate {
        return run_once(&pipeline, count, args.days).await;
    }

    // Prepare a shutdown notifier to signal the sweeper
    let shutdown_notify = Arc::new(Notify::new());

    info!("Spawning job sweeper task");
    let sweeper_handle = tokio::spawn(run_job_sweeper(
        pipeline.tracker().clone(),
        config.jobs.clone(),
        shutdown_notify.clone(),
    ));

    // Launch the Rocket server (blocking until Rocket shuts down)
    info!("Launching Rocket HTTP server");
    if let Err(e) = launch_rocket(AppState::new(pipeline), &config.server).await {
        error!(%e, "Rocket server failed");
    }

    info!("HTTP server stopped; notifying sweeper to shutdown");
    shutdown_notify.notify_waiters();

    match tokio::time::timeout(Duration::from_secs(5), sweeper_handle).await {
        Ok(Ok(Ok(()))) => info!("sweeper exited cleanly"),
        Ok(Ok(Err(e))) => error!(%e, "sweeper task returned an error"),
        Ok(Err(join_err)) => error!(%join_err, "sweeper task panicked"),
        Err(_) => info!("Timed out waiting for sweeper to exit; continuing shutdown"),
    }

    info!("Shutdown complete");
    Ok(())
}

/// One-shot mode: fetch, generate `count` posts, save them and print a summary.
async fn run_once(pipeline: &newsdesk::pipeline::Pipeline, count: i64, days: i64) -> Result<()> {
    let req = GenerateRequest {
        count,
        days,
        save_to_disk: true,
        ..Default::default()
    };

    info!(count, days, "one-shot generation starting");
    let items = pipeline.generate(&req).await?;

    for item in &items {
        println!(
            "{}. {}",
            item.post_index,
            item.post.news_article_title.as_deref().unwrap_or("(untitled)")
        );
        if let Some(path) = &item.image.image_path {
            println!("   image: {}", path);
        }
    }
    println!("Generated {} post(s)", items.len());
    Ok(())
}
