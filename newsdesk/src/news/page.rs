use anyhow::{Context, Result};
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::info;

use crate::models::Article;
use crate::relevance;

/// Score given to articles the user picked by url
pub const SELECTED_ARTICLE_SCORE: f64 = 0.6;

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|v| !v.is_empty())
}

/// Build an article from a page's title and description metadata.
/// Returns `None` when no title can be found.
pub fn parse_article(html: &str, url: &str) -> Option<Article> {
    let document = Html::parse_document(html);

    let title = first_attr(&document, r#"meta[property="og:title"]"#, "content")
        .or_else(|| first_text(&document, "title"))?;
    let description = first_attr(&document, r#"meta[name="description"]"#, "content")
        .or_else(|| first_attr(&document, r#"meta[property="og:description"]"#, "content"))
        .unwrap_or_default();

    Some(Article {
        category: relevance::categorize(&title, &description),
        title,
        url: url.to_string(),
        summary: description,
        relevance_score: SELECTED_ARTICLE_SCORE,
        source: None,
        published_date: None,
    })
}

/// Fetch `url` and build an article from its metadata.
pub async fn fetch_article(client: &Client, url: &str) -> Result<Option<Article>> {
    let response = client.get(url).send().await.context("failed to fetch article page")?;

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow::anyhow!("article fetch failed with status: {}", status));
    }

    let html = response.text().await.context("failed to read response body")?;
    let article = parse_article(&html, url);
    if article.is_some() {
        info!(url, "news: article metadata extracted");
    }
    Ok(article)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsCategory;

    #[test]
    fn prefers_open_graph_title() {
        let html = r#"<html><head>
            <title>Fallback title</title>
            <meta property="og:title" content="Recruiters adopt AI screening for talent">
            <meta name="description" content="A look at new hiring tools.">
        </head></html>"#;
        let article = parse_article(html, "https://example.org/a").unwrap();
        assert_eq!(article.title, "Recruiters adopt AI screening for talent");
        assert_eq!(article.summary, "A look at new hiring tools.");
        assert_eq!(article.relevance_score, SELECTED_ARTICLE_SCORE);
        assert_eq!(article.category, NewsCategory::AiInTalent);
        assert_eq!(article.url, "https://example.org/a");
    }

    #[test]
    fn falls_back_to_title_tag_and_og_description() {
        let html = r#"<html><head>
            <title> New model released </title>
            <meta property="og:description" content="Benchmarks inside">
        </head></html>"#;
        let article = parse_article(html, "https://example.org/b").unwrap();
        assert_eq!(article.title, "New model released");
        assert_eq!(article.summary, "Benchmarks inside");
    }

    #[test]
    fn untitled_page_is_skipped() {
        assert!(parse_article("<html><body>hi</body></html>", "https://example.org/c").is_none());
    }
}
