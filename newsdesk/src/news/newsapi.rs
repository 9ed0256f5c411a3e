use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;

use super::{scored_article, NewsProvider};
use crate::models::Article;

pub const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";

/// NewsAPI.org `everything` endpoint
pub struct NewsApiProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl NewsApiProvider {
    pub fn new(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: NEWSAPI_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    title: Option<String>,
    url: Option<String>,
    description: Option<String>,
    content: Option<String>,
    source: Option<NewsApiSource>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

#[async_trait::async_trait]
impl NewsProvider for NewsApiProvider {
    fn name(&self) -> &str {
        "newsapi"
    }

    async fn search(&self, query: &str, max_results: usize, days: u32) -> Result<Vec<Article>> {
        let mut params = vec![
            ("q", query.to_string()),
            ("apiKey", self.api_key.clone()),
            ("sortBy", "publishedAt".to_string()),
            ("language", "en".to_string()),
            ("pageSize", max_results.to_string()),
        ];
        if days > 0 {
            let from = Utc::now() - chrono::Duration::days(i64::from(days));
            params.push(("from", from.format("%Y-%m-%dT%H:%M:%SZ").to_string()));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .context("NewsAPI request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("NewsAPI returned status {}", response.status());
        }

        let body: NewsApiResponse = response
            .json()
            .await
            .context("Failed to parse NewsAPI response")?;

        let articles = body
            .articles
            .into_iter()
            .take(max_results)
            .filter_map(|item| {
                let title = item.title.filter(|t| !t.trim().is_empty())?;
                let url = item.url.filter(|u| !u.trim().is_empty())?;
                let summary = match item.description.filter(|d| !d.trim().is_empty()) {
                    Some(d) => d,
                    None => item
                        .content
                        .unwrap_or_default()
                        .chars()
                        .take(200)
                        .collect(),
                };
                Some(scored_article(
                    &title,
                    &url,
                    &summary,
                    item.source.and_then(|s| s.name),
                    item.published_at,
                ))
            })
            .collect();

        Ok(articles)
    }
}
