/*!
common/src/lib.rs

Shared configuration types and DB helper functions for Newsdesk.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader merging a default file with an optional override
- A helper to open the SQLite pool used by the persistent job store
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;

/// HTTP server configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (e.g. "0.0.0.0")
    pub bind: Option<String>,
    pub port: Option<u16>,
    /// Directory holding the static web UI
    pub static_dir: Option<String>,
}

/// Text-generation endpoint (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    pub adapter: Option<String>, // "remote", "stub"
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl LlmConfig {
    pub fn adapter(&self) -> &str {
        self.adapter.as_deref().unwrap_or("remote")
    }
}

/// Image-generation endpoint (OpenAI-compatible images API)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageConfig {
    pub adapter: Option<String>, // "remote", "stub"
    pub api_url: Option<String>,
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub size: Option<String>,
    pub quality: Option<String>,
    /// Rewrite the post's image prompt with the text model before rendering
    pub enhance_prompt: Option<bool>,
    pub timeout_seconds: Option<u64>,
}

impl ImageConfig {
    pub fn adapter(&self) -> &str {
        self.adapter.as_deref().unwrap_or("remote")
    }

    pub fn size(&self) -> &str {
        self.size.as_deref().unwrap_or("1024x1024")
    }

    pub fn quality(&self) -> &str {
        self.quality.as_deref().unwrap_or("standard")
    }
}

/// Brand palette appended to every image prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandConfig {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            primary: "#7367FF".into(),
            secondary: "#F3F3F3".into(),
            accent: "#FFA050".into(),
            background: "#0D0919".into(),
            text: "#F3F3F3".into(),
        }
    }
}

/// Post writing guidelines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PostConfig {
    pub tone: String,
    pub max_length: usize,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            tone: "professional".into(),
            max_length: 3000,
        }
    }
}

/// News provider selection and credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsConfig {
    /// Providers tried in order: "newsapi", "serpapi", "web", "placeholder"
    pub providers: Vec<String>,
    /// Serve the built-in placeholder set when every provider comes back empty
    pub placeholder_fallback: bool,
    pub newsapi_key_env: Option<String>,
    pub serpapi_key_env: Option<String>,
    pub newsapi_url: Option<String>,
    pub serpapi_url: Option<String>,
    pub web_search_url: Option<String>,
    pub timeout_seconds: u64,
    /// Upper bound on raw articles kept per fetch
    pub fetch_limit: usize,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            providers: vec!["newsapi".into(), "serpapi".into(), "web".into()],
            placeholder_fallback: true,
            newsapi_key_env: Some("NEWSAPI_KEY".into()),
            serpapi_key_env: Some("SERPAPI_KEY".into()),
            newsapi_url: None,
            serpapi_url: None,
            web_search_url: None,
            timeout_seconds: 30,
            fetch_limit: 10,
        }
    }
}

/// Fan-out limits for post/image generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_concurrency: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { max_concurrency: 4 }
    }
}

/// Job store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub backend: String, // "memory", "sqlite"
    pub database_path: Option<String>,
    /// Finished jobs older than this are evicted
    pub retention_minutes: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            backend: "memory".into(),
            database_path: None,
            retention_minutes: 24 * 60,
            sweep_interval_seconds: 300,
        }
    }
}

/// Where generated content is written when `save_to_disk` is requested
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "output".into(),
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub brand: BrandConfig,
    #[serde(default)]
    pub post: PostConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for (path, label) in [(default_path, "default"), (override_path, "override")] {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {} config: {}", label, path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse {} configuration", label))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Read a secret from the environment variable named `var`.
/// Unset, empty and placeholder values all count as missing.
pub fn secret_from_env(var: Option<&str>) -> Option<String> {
    let value = std::env::var(var?).ok()?;
    let value = value.trim();
    if value.is_empty() || value.starts_with("your_") {
        None
    } else {
        Some(value.to_string())
    }
}

/// Initialize an SQLite connection pool.
///
/// Creates the parent directory if necessary and returns a `SqlitePool` in WAL mode.
/// The job store is the only consumer, so the pool is kept small.
///
/// Example:
///   let pool = init_db_pool("data/jobs.db").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create DB parent directory: {}", parent.display())
            })?;
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}
