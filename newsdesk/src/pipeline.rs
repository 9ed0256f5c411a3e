//! Orchestration: collect news, pick articles, then fan out
//! (article -> post -> image) work either inline or as a tracked job.

use futures::future::{join_all, try_join_all};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::generator::{ContentGenerator, ImageGenerator};
use crate::jobs::JobTracker;
use crate::models::{Article, CollectParams, GeneratedItem, GenerateRequest, NewsCollection};
use crate::news::ArticleFetcher;
use crate::output::OutputWriter;
use crate::relevance::RelevanceFilter;

/// Minimum selection size used when generation falls back to collected news
const GENERATE_MIN_COLLECT: usize = 5;

/// What a slot will work on: an article, or the reason it has none
type Slot = std::result::Result<Article, String>;

#[derive(Clone)]
pub struct Pipeline {
    fetcher: Arc<ArticleFetcher>,
    filter: RelevanceFilter,
    writer: Arc<ContentGenerator>,
    images: Arc<ImageGenerator>,
    tracker: JobTracker,
    output: OutputWriter,
    max_concurrency: usize,
}

impl Pipeline {
    pub fn new(
        fetcher: Arc<ArticleFetcher>,
        writer: Arc<ContentGenerator>,
        images: Arc<ImageGenerator>,
        tracker: JobTracker,
        output: OutputWriter,
        max_concurrency: usize,
    ) -> Self {
        Self {
            fetcher,
            filter: RelevanceFilter::new(),
            writer,
            images,
            tracker,
            output,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    async fn news(&self, count: usize, days: u32) -> Result<NewsCollection> {
        let raw = self.fetcher.fetch(count, days).await?;
        Ok(self.filter.filter(raw, count))
    }

    /// Fetch and rank news. An empty selection is `NotFound`.
    pub async fn collect(&self, params: CollectParams) -> Result<NewsCollection> {
        info!(count = params.count, days = params.days, "pipeline: collecting news");
        let collection = self.news(params.count, params.days).await?;
        if collection.articles.is_empty() {
            return Err(Error::NotFound(
                "No news articles found. Check API keys or try again later.".into(),
            ));
        }
        info!(
            total = collection.total_count,
            filtered = collection.filtered_count,
            "pipeline: news collected"
        );
        Ok(collection)
    }

    /// One slot per requested url. When no url resolves, the same number of
    /// slots is filled from filtered news instead.
    async fn resolve_slots(&self, req: &GenerateRequest) -> Result<Vec<Slot>> {
        let wanted = req.expected_items();
        let urls = req.requested_urls();
        if !urls.is_empty() {
            let fetched = join_all(urls.iter().map(|u| self.fetcher.fetch_article(u))).await;
            let slots: Vec<Slot> = urls
                .iter()
                .zip(fetched)
                .map(|(url, article)| {
                    article.ok_or_else(|| format!("Could not fetch article metadata from {}", url))
                })
                .collect();

            if slots.iter().any(|s| s.is_ok()) {
                return Ok(slots);
            }
            warn!(urls = urls.len(), "pipeline: no requested url resolved, using collected news");
        }

        let collection = self
            .news(wanted.max(GENERATE_MIN_COLLECT), req.days())
            .await?;
        let articles: Vec<Slot> = collection
            .articles
            .into_iter()
            .take(wanted)
            .map(Ok)
            .collect();

        if articles.is_empty() {
            return Err(Error::NotFound(
                "No news articles found. Cannot generate posts.".into(),
            ));
        }
        Ok(articles)
    }

    fn save_dir(&self, req: &GenerateRequest) -> Option<PathBuf> {
        req.save_to_disk.then(|| self.output.images_dir())
    }

    async fn produce(&self, article: Article, save_dir: Option<PathBuf>) -> Result<GeneratedItem> {
        let post = self.writer.generate_post(&article).await?;
        let image = self
            .images
            .generate_image(&post.image_prompt, save_dir.as_deref())
            .await?;
        Ok(GeneratedItem {
            post,
            image,
            post_index: 0,
        })
    }

    async fn save_outputs(&self, items: &[GeneratedItem]) {
        if items.is_empty() {
            return;
        }
        if let Err(e) = self.output.save(items).await {
            warn!("pipeline: failed to save outputs to disk: {}", e);
        }
    }

    /// Generate every item before returning; any failure fails the whole call.
    pub async fn generate(&self, req: &GenerateRequest) -> Result<Vec<GeneratedItem>> {
        req.validate()?;
        info!(count = req.count(), urls = req.requested_urls().len(), "pipeline: generating posts");

        let articles: Vec<Article> = self
            .resolve_slots(req)
            .await?
            .into_iter()
            .filter_map(|s| s.ok())
            .collect();

        let limiter = Arc::new(Semaphore::new(self.max_concurrency));
        let save_dir = self.save_dir(req);

        let items = try_join_all(articles.into_iter().enumerate().map(|(i, article)| {
            let limiter = limiter.clone();
            let save_dir = save_dir.clone();
            async move {
                let _permit = limiter
                    .acquire()
                    .await
                    .map_err(|e| Error::Generation(e.to_string()))?;
                let mut item = self.produce(article, save_dir).await?;
                item.post_index = i + 1;
                Ok::<_, Error>(item)
            }
        }))
        .await?;

        if req.save_to_disk {
            self.save_outputs(&items).await;
        }
        info!(count = items.len(), "pipeline: posts generated");
        Ok(items)
    }

    /// Register a job and run it in the background. Returns `(job_id, total_expected)`.
    pub async fn generate_async(&self, req: GenerateRequest) -> Result<(String, usize)> {
        req.validate()?;
        let total_expected = req.expected_items();
        let job_id = self.tracker.start(total_expected).await?;

        let pipeline = self.clone();
        let id = job_id.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.run_job(&id, &req, total_expected).await {
                error!(job_id = %id, "pipeline: job failed: {}", e);
            }
        });

        Ok((job_id, total_expected))
    }

    async fn run_job(&self, job_id: &str, req: &GenerateRequest, total_expected: usize) -> Result<()> {
        let mut slots = match self.resolve_slots(req).await {
            Ok(slots) => slots,
            Err(e) => {
                let reason = e.to_string();
                for position in 0..total_expected {
                    self.tracker.fail_item(job_id, position, &reason).await?;
                }
                return Err(e);
            }
        };
        slots.truncate(total_expected);
        slots.resize_with(total_expected, || Err("No article available for this slot".to_string()));

        let limiter = Arc::new(Semaphore::new(self.max_concurrency));
        let save_dir = self.save_dir(req);

        let runs = slots.into_iter().enumerate().map(|(position, slot)| {
            let limiter = limiter.clone();
            let save_dir = save_dir.clone();
            async move {
                match slot {
                    Ok(article) => {
                        let work = async {
                            let _permit = limiter
                                .acquire()
                                .await
                                .map_err(|e| Error::Generation(e.to_string()))?;
                            self.produce(article, save_dir).await
                        };
                        self.tracker.run_item(job_id, position, work).await
                    }
                    Err(reason) => self.tracker.fail_item(job_id, position, &reason).await,
                }
            }
        });

        for outcome in join_all(runs).await {
            if let Err(e) = outcome {
                error!(job_id, "pipeline: job store rejected an update: {}", e);
            }
        }

        let status = self.tracker.status(job_id).await?;
        info!(
            job_id,
            completed = status.completed,
            failed = status.failed,
            "pipeline: job finished"
        );
        if req.save_to_disk {
            self.save_outputs(&status.items).await;
        }
        Ok(())
    }
}
