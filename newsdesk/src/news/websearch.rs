use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use url::Url;

use super::{scored_article, NewsProvider};
use crate::models::Article;

pub const WEB_SEARCH_URL: &str = "https://html.duckduckgo.com/html/";

const RESULT_SELECTORS: [&str; 2] = ["a.result__a", "a.web-result"];

/// Keyless fallback: scrape the DuckDuckGo HTML results page
pub struct WebSearchProvider {
    client: Client,
    base_url: String,
}

impl WebSearchProvider {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: WEB_SEARCH_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// Resolve a result href to an absolute article url.
/// Protocol-relative links get https, DuckDuckGo redirect links are unwrapped,
/// site-relative links are dropped.
fn resolve_href(href: &str) -> Option<String> {
    let href = href.trim();
    let absolute = if let Some(rest) = href.strip_prefix("//") {
        format!("https://{}", rest)
    } else if href.starts_with('/') || href.is_empty() {
        return None;
    } else {
        href.to_string()
    };

    let parsed = Url::parse(&absolute).ok()?;
    if parsed.host_str().map_or(false, |h| h.ends_with("duckduckgo.com")) && parsed.path() == "/l/" {
        return parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }
    Some(absolute)
}

/// Extract up to `max_results` articles from a results page.
pub fn parse_results(html: &str, max_results: usize) -> Vec<Article> {
    let document = Html::parse_document(html);

    for raw in RESULT_SELECTORS {
        let Ok(selector) = Selector::parse(raw) else { continue };
        let articles: Vec<Article> = document
            .select(&selector)
            .filter_map(|a| {
                let title = a.text().collect::<String>();
                let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
                if title.is_empty() {
                    return None;
                }
                let href = a
                    .value()
                    .attr("href")
                    .or_else(|| a.value().attr("data-result"))?;
                let url = resolve_href(href)?;
                Some(scored_article(&title, &url, "", None, None))
            })
            .take(max_results)
            .collect();

        if !articles.is_empty() {
            return articles;
        }
    }

    Vec::new()
}

#[async_trait::async_trait]
impl NewsProvider for WebSearchProvider {
    fn name(&self) -> &str {
        "web"
    }

    async fn search(&self, query: &str, max_results: usize, _days: u32) -> Result<Vec<Article>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", format!("{} news", query))])
            .send()
            .await
            .context("web search request failed")?;

        if !response.status().is_success() {
            anyhow::bail!("web search returned status {}", response.status());
        }

        let body = response
            .text()
            .await
            .context("failed to read web search response body")?;

        Ok(parse_results(&body, max_results))
    }
}
