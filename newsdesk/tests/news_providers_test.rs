use common::NewsConfig;
use mockito::Matcher;
use newsdesk::models::NewsCategory;
use newsdesk::news::{
    http_client, ArticleFetcher, NewsApiProvider, NewsProvider, SerpApiProvider, WebSearchProvider,
};

#[tokio::test]
async fn test_newsapi_maps_articles_and_sends_query_params() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "AI hiring".into()),
            Matcher::UrlEncoded("apiKey".into(), "news-key".into()),
            Matcher::UrlEncoded("sortBy".into(), "publishedAt".into()),
            Matcher::UrlEncoded("language".into(), "en".into()),
            Matcher::UrlEncoded("pageSize".into(), "5".into()),
            Matcher::Regex(r"from=\d{4}-\d{2}-\d{2}T".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "status": "ok",
                "articles": [
                    {
                        "title": "Recruiters lean on AI to screen candidates",
                        "url": "https://news.example.org/screening",
                        "description": "Talent teams adopt new hiring tools.",
                        "source": {"id": null, "name": "Example News"},
                        "publishedAt": "2026-10-01T08:00:00Z"
                    },
                    {
                        "title": "Generative AI model tops benchmark",
                        "url": "https://news.example.org/benchmark",
                        "description": null,
                        "content": "A new model reached the top of the leaderboard."
                    },
                    {"title": "", "url": "https://news.example.org/untitled"},
                    {"title": "No url here", "url": null}
                ]
            }"#,
        )
        .create_async()
        .await;

    let provider = NewsApiProvider::new(http_client(5).unwrap(), "news-key").with_base_url(server.url());
    let articles = provider.search("AI hiring", 5, 7).await.expect("search");

    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].url, "https://news.example.org/screening");
    assert_eq!(articles[0].source.as_deref(), Some("Example News"));
    assert_eq!(articles[0].published_date.as_deref(), Some("2026-10-01T08:00:00Z"));
    assert_eq!(articles[0].category, NewsCategory::AiInTalent);

    // content stands in for a missing description
    assert_eq!(articles[1].summary, "A new model reached the top of the leaderboard.");
    assert_eq!(articles[1].category, NewsCategory::AiAdvancement);
    assert!(articles
        .iter()
        .all(|a| (0.0..=1.0).contains(&a.relevance_score)));

    mock.assert_async().await;
}

#[tokio::test]
async fn test_newsapi_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("GET", "/")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"status": "error", "code": "apiKeyInvalid"}"#)
        .create_async()
        .await;

    let provider = NewsApiProvider::new(http_client(5).unwrap(), "bad").with_base_url(server.url());
    let err = provider.search("AI", 5, 7).await.unwrap_err();
    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_serpapi_accepts_both_source_shapes() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("q".into(), "AI HR news".into()),
            Matcher::UrlEncoded("api_key".into(), "serp-key".into()),
            Matcher::UrlEncoded("engine".into(), "google".into()),
            Matcher::UrlEncoded("tbm".into(), "nws".into()),
            Matcher::UrlEncoded("tbs".into(), "qdr:w".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "news_results": [
                    {
                        "title": "HR departments pilot AI assistants",
                        "link": "https://hr.example.com/pilot",
                        "snippet": "Human resources teams test chat tools.",
                        "source": "HR Weekly",
                        "date": "2 days ago"
                    },
                    {
                        "title": "Machine learning chip announced",
                        "link": "https://tech.example.com/chip",
                        "source": {"name": "Tech Daily", "icon": "https://tech.example.com/i.png"}
                    }
                ]
            }"#,
        )
        .create_async()
        .await;

    let provider = SerpApiProvider::new(http_client(5).unwrap(), "serp-key").with_base_url(server.url());
    let articles = provider.search("AI HR", 5, 7).await.expect("search");

    assert_eq!(articles.len(), 2);
    assert_eq!(articles[0].source.as_deref(), Some("HR Weekly"));
    assert_eq!(articles[0].category, NewsCategory::AiInHr);
    assert_eq!(articles[1].source.as_deref(), Some("Tech Daily"));
    assert_eq!(articles[1].summary, "");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_web_search_parses_result_page() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("GET", "/")
        .match_query(Matcher::UrlEncoded("q".into(), "generative AI news".into()))
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(
            r#"<html><body>
                <a class="result__a" href="https://a.example.com/one">Generative AI goes mainstream</a>
                <a class="result__a" href="https://b.example.com/two">AI recruiting startup raises funds</a>
            </body></html>"#,
        )
        .create_async()
        .await;

    let provider = WebSearchProvider::new(http_client(5).unwrap()).with_base_url(server.url());
    let articles = provider.search("generative AI", 5, 7).await.expect("search");

    let urls: Vec<&str> = articles.iter().map(|a| a.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.example.com/one", "https://b.example.com/two"]);
}

#[tokio::test]
async fn test_fetcher_from_config_uses_keys_and_url_overrides() {
    let mut server = mockito::Server::new_async().await;

    // every topic query hits the mock once
    let mock = server
        .mock("GET", "/newsapi")
        .match_query(Matcher::UrlEncoded("apiKey".into(), "from-env".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"articles": [
                {"title": "AI hiring report", "url": "https://x.example.com/1", "description": "hiring"},
                {"title": "AI HR survey", "url": "https://x.example.com/2", "description": "hr"}
            ]}"#,
        )
        .expect(3)
        .create_async()
        .await;

    std::env::set_var("NEWSDESK_TEST_NEWSAPI_KEY", "from-env");
    let cfg = NewsConfig {
        providers: vec!["serpapi".into(), "newsapi".into()],
        placeholder_fallback: false,
        newsapi_key_env: Some("NEWSDESK_TEST_NEWSAPI_KEY".into()),
        // no key for serpapi, so it is skipped
        serpapi_key_env: Some("NEWSDESK_TEST_UNSET_SERPAPI_KEY".into()),
        newsapi_url: Some(format!("{}/newsapi", server.url())),
        timeout_seconds: 5,
        ..Default::default()
    };

    let fetcher = ArticleFetcher::from_config(&cfg).expect("fetcher");
    let articles = fetcher.fetch(5, 7).await.expect("fetch");

    // three queries returned the same two urls
    assert_eq!(articles.len(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetcher_without_usable_providers_is_unavailable() {
    let cfg = NewsConfig {
        providers: vec!["newsapi".into()],
        placeholder_fallback: false,
        newsapi_key_env: Some("NEWSDESK_TEST_UNSET_NEWSAPI_KEY".into()),
        ..Default::default()
    };

    let fetcher = ArticleFetcher::from_config(&cfg).expect("fetcher");
    assert!(matches!(
        fetcher.fetch(5, 7).await,
        Err(newsdesk::Error::ProviderUnavailable)
    ));
}

#[tokio::test]
async fn test_fetch_article_reads_page_metadata() {
    let mut server = mockito::Server::new_async().await;

    let _page = server
        .mock("GET", "/story")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body(
            r#"<html><head>
                <title>Hiring with AI | Example</title>
                <meta name="description" content="Recruiters and candidates meet a new screening tool.">
            </head><body>...</body></html>"#,
        )
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/gone")
        .with_status(404)
        .create_async()
        .await;

    let fetcher = ArticleFetcher::new(vec![], false, 10).unwrap();

    let url = format!("{}/story", server.url());
    let article = fetcher.fetch_article(&url).await.expect("article");
    assert_eq!(article.title, "Hiring with AI | Example");
    assert_eq!(article.url, url);
    assert_eq!(article.relevance_score, 0.6);
    assert_eq!(article.category, NewsCategory::AiInTalent);

    assert!(fetcher
        .fetch_article(&format!("{}/gone", server.url()))
        .await
        .is_none());
}
