use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;

use super::{scored_article, NewsProvider};
use crate::models::Article;

pub const SERPAPI_URL: &str = "https://serpapi.com/search";

/// Google News results through SerpAPI
pub struct SerpApiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SerpApiProvider {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: SERPAPI_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Google's recency filter for a window of `days`
fn recency_filter(days: u32) -> &'static str {
    match days {
        0..=1 => "qdr:d",
        2..=7 => "qdr:w",
        _ => "qdr:m",
    }
}

#[derive(Debug, Deserialize)]
struct SerpResponse {
    #[serde(default)]
    news_results: Vec<SerpNewsResult>,
}

#[derive(Debug, Deserialize)]
struct SerpNewsResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    source: Option<SerpSource>,
    date: Option<String>,
}

// the source field is a plain name on older responses and an object on newer ones
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SerpSource {
    Name(String),
    Detailed { name: Option<String> },
}

impl SerpSource {
    fn into_name(self) -> Option<String> {
        match self {
            SerpSource::Name(n) => Some(n),
            SerpSource::Detailed { name } => name,
        }
    }
}

#[async_trait::async_trait]
impl NewsProvider for SerpApiProvider {
    fn name(&self) -> &str {
        "serpapi"
    }

    async fn search(&self, query: &str, max_results: usize, days: u32) -> Result<Vec<Article>> {
        let mut params = vec![
            ("q", format!("{} news", query)),
            ("api_key", self.api_key.clone()),
            ("engine", "google".to_string()),
            ("tbm", "nws".to_string()),
            ("num", max_results.to_string()),
        ];
        if days > 0 {
            params.push(("tbs", recency_filter(days).to_string()));
        }
        params.push(("hl", "en".to_string()));
        params.push(("gl", "us".to_string()));

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .context("SerpAPI request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("SerpAPI returned status {}", response.status());
        }

        let body: SerpResponse = response
            .json()
            .await
            .context("Failed to parse SerpAPI response")?;

        let articles = body
            .news_results
            .into_iter()
            .take(max_results)
            .filter_map(|item| {
                let title = item.title.filter(|t| !t.trim().is_empty())?;
                let url = item.link.filter(|u| !u.trim().is_empty())?;
                Some(scored_article(
                    &title,
                    &url,
                    item.snippet.as_deref().unwrap_or(""),
                    item.source.and_then(SerpSource::into_name),
                    item.date,
                ))
            })
            .collect();

        Ok(articles)
    }
}
