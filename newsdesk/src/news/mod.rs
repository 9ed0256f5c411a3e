//! Article fetching from external news and search providers.
//!
//! Providers are tried in the configured order; the first one that yields
//! anything wins. Results are deduplicated by url and capped at the fetch
//! limit. When nothing comes back the placeholder set is served if enabled.

use anyhow::{Context, Result};
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use common::{secret_from_env, NewsConfig};

use crate::models::Article;
use crate::relevance;

pub mod newsapi;
pub mod page;
pub mod placeholder;
pub mod serpapi;
pub mod websearch;

pub use newsapi::NewsApiProvider;
pub use placeholder::PlaceholderProvider;
pub use serpapi::SerpApiProvider;
pub use websearch::WebSearchProvider;

/// Fixed topic queries sent to every provider
pub const TOPIC_QUERIES: [&str; 3] = [
    r#"(AI OR "artificial intelligence") (hiring OR recruitment OR "talent acquisition")"#,
    r#"(AI OR "artificial intelligence") (HR OR "human resources")"#,
    r#""AI advancement" OR "AI breakthrough" OR "generative AI""#,
];

/// Results requested per query and provider
pub const RESULTS_PER_QUERY: usize = 5;

pub(crate) const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Newsdesk/0.1";

/// A source of candidate articles for a query
#[async_trait::async_trait]
pub trait NewsProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str, max_results: usize, days: u32) -> Result<Vec<Article>>;
}

/// Build the shared HTTP client used by providers and page fetches.
pub fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build reqwest client")
}

/// Article from provider fields, scored and categorized by the relevance heuristics.
pub(crate) fn scored_article(
    title: &str,
    url: &str,
    summary: &str,
    source: Option<String>,
    published_date: Option<String>,
) -> Article {
    let (category, relevance_score) = relevance::assess(title, summary);
    Article {
        title: title.trim().to_string(),
        url: url.trim().to_string(),
        summary: summary.trim().to_string(),
        relevance_score,
        category,
        source,
        published_date,
    }
}

/// Keep the first article for each url, preserving order.
pub fn dedup_by_url(articles: Vec<Article>) -> Vec<Article> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|a| seen.insert(a.url.clone()))
        .collect()
}

pub struct ArticleFetcher {
    providers: Vec<Arc<dyn NewsProvider>>,
    placeholder_fallback: bool,
    fetch_limit: usize,
    client: Client,
}

impl ArticleFetcher {
    pub fn new(
        providers: Vec<Arc<dyn NewsProvider>>,
        placeholder_fallback: bool,
        fetch_limit: usize,
    ) -> Result<Self> {
        Ok(Self {
            providers,
            placeholder_fallback,
            fetch_limit: fetch_limit.max(1),
            client: http_client(30)?,
        })
    }

    /// Build the provider chain from `[news]`. Keyed providers without a key are skipped.
    pub fn from_config(cfg: &NewsConfig) -> Result<Self> {
        let client = http_client(cfg.timeout_seconds)?;
        let mut providers: Vec<Arc<dyn NewsProvider>> = Vec::new();

        for name in &cfg.providers {
            match name.as_str() {
                "newsapi" => match secret_from_env(cfg.newsapi_key_env.as_deref()) {
                    Some(key) => {
                        let mut p = NewsApiProvider::new(client.clone(), key);
                        if let Some(url) = &cfg.newsapi_url {
                            p = p.with_base_url(url);
                        }
                        providers.push(Arc::new(p));
                    }
                    None => info!("news: NewsAPI key not set, skipping provider"),
                },
                "serpapi" => match secret_from_env(cfg.serpapi_key_env.as_deref()) {
                    Some(key) => {
                        let mut p = SerpApiProvider::new(client.clone(), key);
                        if let Some(url) = &cfg.serpapi_url {
                            p = p.with_base_url(url);
                        }
                        providers.push(Arc::new(p));
                    }
                    None => info!("news: SerpAPI key not set, skipping provider"),
                },
                "web" => {
                    let mut p = WebSearchProvider::new(client.clone());
                    if let Some(url) = &cfg.web_search_url {
                        p = p.with_base_url(url);
                    }
                    providers.push(Arc::new(p));
                }
                "placeholder" => providers.push(Arc::new(PlaceholderProvider)),
                other => anyhow::bail!("Unknown news provider: {}", other),
            }
        }

        info!(
            providers = ?providers.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            placeholder_fallback = cfg.placeholder_fallback,
            "news: article fetcher configured"
        );

        Ok(Self {
            providers,
            placeholder_fallback: cfg.placeholder_fallback,
            fetch_limit: cfg.fetch_limit.max(1),
            client,
        })
    }

    /// Raw candidates for a selection of `count` articles over the last `days` days.
    pub async fn fetch(&self, count: usize, days: u32) -> crate::Result<Vec<Article>> {
        let limit = self.fetch_limit.max(count);

        for provider in &self.providers {
            let mut found = Vec::new();
            for query in TOPIC_QUERIES {
                match provider.search(query, RESULTS_PER_QUERY, days).await {
                    Ok(articles) => {
                        debug!(provider = provider.name(), query, count = articles.len(), "news: query done");
                        found.extend(articles);
                    }
                    Err(e) => {
                        warn!(provider = provider.name(), query, "news: provider query failed: {:#}", e)
                    }
                }
            }

            if !found.is_empty() {
                let mut unique = dedup_by_url(found);
                unique.truncate(limit);
                info!(provider = provider.name(), count = unique.len(), "news: articles fetched");
                return Ok(unique);
            }
            info!(provider = provider.name(), "news: provider returned no articles");
        }

        if self.placeholder_fallback {
            warn!("news: no articles from any provider, serving placeholder set");
            let mut articles = placeholder::articles();
            articles.truncate(limit);
            return Ok(articles);
        }

        Err(crate::Error::ProviderUnavailable)
    }

    /// Fetch a single page and build an article from its metadata.
    /// Any failure is logged and reported as `None`.
    pub async fn fetch_article(&self, url: &str) -> Option<Article> {
        match page::fetch_article(&self.client, url).await {
            Ok(article) => article,
            Err(e) => {
                warn!(url, "news: failed to fetch article page: {:#}", e);
                None
            }
        }
    }
}
