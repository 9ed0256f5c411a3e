//! Asynchronous multi-item generation jobs.
//!
//! A job owns `total_expected` slots. Each slot starts `pending` and moves
//! exactly once to `done` (its item is appended) or `failed`. A job is
//! finished when no slot is pending; after that nothing more is accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::GeneratedItem;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryJobStore;
pub use sqlite::SqliteJobStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Running,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemState {
    Pending,
    Done,
    Failed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Pending => "pending",
            ItemState::Done => "done",
            ItemState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ItemState::Pending),
            "done" => Some(ItemState::Done),
            "failed" => Some(ItemState::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: String,
    pub total_expected: usize,
    /// Completed items in completion order
    pub items: Vec<GeneratedItem>,
    /// One state per slot, indexed by position
    pub item_states: Vec<ItemState>,
    /// Failure reasons keyed by position
    pub errors: BTreeMap<usize, String>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(id: impl Into<String>, total_expected: usize) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            total_expected,
            items: Vec::new(),
            item_states: vec![ItemState::Pending; total_expected],
            errors: BTreeMap::new(),
            created_at: now,
            // nothing to wait for
            finished_at: (total_expected == 0).then_some(now),
        }
    }

    pub fn completed(&self) -> usize {
        self.items.len()
    }

    pub fn failed(&self) -> usize {
        self.item_states
            .iter()
            .filter(|s| **s == ItemState::Failed)
            .count()
    }

    pub fn is_finished(&self) -> bool {
        self.completed() + self.failed() >= self.total_expected
    }

    pub fn state(&self) -> JobState {
        if self.is_finished() {
            JobState::Done
        } else {
            JobState::Running
        }
    }

    /// Move `position` out of `pending`. Returns false when the slot does not
    /// exist or was already resolved.
    fn resolve(&mut self, position: usize, outcome: ItemState) -> bool {
        match self.item_states.get_mut(position) {
            Some(state) if *state == ItemState::Pending => {
                *state = outcome;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn apply_item(&mut self, position: usize, item: GeneratedItem) -> bool {
        if !self.resolve(position, ItemState::Done) {
            return false;
        }
        self.items.push(item);
        self.touch_finished();
        true
    }

    pub(crate) fn apply_failure(&mut self, position: usize, reason: &str) -> bool {
        if !self.resolve(position, ItemState::Failed) {
            return false;
        }
        self.errors.insert(position, reason.to_string());
        self.touch_finished();
        true
    }

    fn touch_finished(&mut self) {
        if self.finished_at.is_none() && self.is_finished() {
            self.finished_at = Some(Utc::now());
        }
    }
}

/// Snapshot returned by `GET /api/generate/status/<job_id>`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatus {
    pub job_id: String,
    pub state: JobState,
    pub total_expected: usize,
    pub completed: usize,
    pub failed: usize,
    pub items: Vec<GeneratedItem>,
    pub item_states: Vec<ItemState>,
    /// Failure reasons keyed by 1-based post index
    #[serde(default)]
    pub errors: BTreeMap<usize, String>,
}

impl From<Job> for JobStatus {
    fn from(job: Job) -> Self {
        Self {
            state: job.state(),
            completed: job.completed(),
            failed: job.failed(),
            errors: job.errors.into_iter().map(|(p, e)| (p + 1, e)).collect(),
            job_id: job.id,
            total_expected: job.total_expected,
            items: job.items,
            item_states: job.item_states,
        }
    }
}

/// Persistence seam for jobs. Every mutation is atomic per job.
#[async_trait::async_trait]
pub trait JobStore: Send + Sync {
    /// Register a new job with all slots pending and return it.
    async fn create(&self, total_expected: usize) -> Result<Job>;

    async fn get(&self, job_id: &str) -> Result<Option<Job>>;

    /// Record the item for `position`. Returns false if the job is unknown or
    /// the slot is already resolved.
    async fn append(&self, job_id: &str, position: usize, item: GeneratedItem) -> Result<bool>;

    /// Mark `position` failed. Same acceptance rules as `append`.
    async fn mark_failed(&self, job_id: &str, position: usize, reason: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Job>>;

    /// Drop finished jobs whose `finished_at` is older than `cutoff`.
    async fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

pub(crate) fn new_job_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Front door to the job store used by the pipeline and the API
#[derive(Clone)]
pub struct JobTracker {
    store: Arc<dyn JobStore>,
}

impl JobTracker {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryJobStore::new()))
    }

    /// Register a job; the id is visible to `status` before this returns.
    pub async fn start(&self, total_expected: usize) -> Result<String> {
        let job = self.store.create(total_expected).await?;
        info!(job_id = %job.id, total_expected, "jobs: job registered");
        Ok(job.id)
    }

    /// Run one unit of work for `position` and record its outcome.
    pub async fn run_item<F>(&self, job_id: &str, position: usize, work: F) -> Result<()>
    where
        F: Future<Output = Result<GeneratedItem>> + Send,
    {
        match work.await {
            Ok(mut item) => {
                item.post_index = position + 1;
                if self.store.append(job_id, position, item).await? {
                    debug!(job_id, position, "jobs: item appended");
                } else {
                    warn!(job_id, position, "jobs: item rejected, slot already resolved");
                }
            }
            Err(e) => {
                warn!(job_id, position, "jobs: item failed: {}", e);
                self.store.mark_failed(job_id, position, &e.to_string()).await?;
            }
        }
        Ok(())
    }

    /// Resolve a slot that will never run.
    pub async fn fail_item(&self, job_id: &str, position: usize, reason: &str) -> Result<()> {
        if self.store.mark_failed(job_id, position, reason).await? {
            warn!(job_id, position, reason, "jobs: slot failed without running");
        }
        Ok(())
    }

    pub async fn status(&self, job_id: &str) -> Result<JobStatus> {
        self.store
            .get(job_id)
            .await?
            .map(JobStatus::from)
            .ok_or_else(|| Error::NotFound(format!("Job not found: {}", job_id)))
    }

    /// Evict jobs that finished more than `retention` ago.
    pub async fn sweep(&self, retention: chrono::Duration) -> Result<usize> {
        let evicted = self.store.evict_finished_before(Utc::now() - retention).await?;
        if evicted > 0 {
            info!(evicted, "jobs: expired jobs evicted");
        }
        Ok(evicted)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{GeneratedImage, Post};

    pub(crate) fn item(url: &str) -> GeneratedItem {
        GeneratedItem {
            post: Post {
                content: format!("post about {}", url),
                hashtags: vec!["#AI".into()],
                image_prompt: "prompt".into(),
                metadata: Default::default(),
                news_article_title: Some(url.to_string()),
                news_article_url: Some(url.to_string()),
            },
            image: GeneratedImage {
                image_url: Some("stub://image".into()),
                image_path: None,
                prompt_used: "prompt".into(),
                generation_metadata: Default::default(),
            },
            post_index: 0,
        }
    }

    #[test]
    fn job_finishes_when_every_slot_resolves() {
        let mut job = Job::new("j", 3);
        assert_eq!(job.state(), JobState::Running);
        assert!(job.apply_item(2, item("c")));
        assert!(job.apply_failure(0, "boom"));
        assert_eq!(job.state(), JobState::Running);
        assert!(job.apply_item(1, item("b")));
        assert_eq!(job.state(), JobState::Done);
        assert!(job.finished_at.is_some());
        assert_eq!(job.completed(), 2);
        assert_eq!(job.failed(), 1);
    }

    #[test]
    fn resolved_or_unknown_slots_are_rejected() {
        let mut job = Job::new("j", 1);
        assert!(job.apply_item(0, item("a")));
        assert!(!job.apply_item(0, item("a")));
        assert!(!job.apply_failure(0, "late"));
        assert!(!job.apply_item(5, item("x")));
        assert_eq!(job.completed(), 1);
    }

    #[tokio::test]
    async fn tracker_status_reports_progress() {
        let tracker = JobTracker::in_memory();
        let id = tracker.start(2).await.unwrap();

        let status = tracker.status(&id).await.unwrap();
        assert_eq!(status.completed, 0);
        assert!(status.items.is_empty());
        assert_eq!(status.item_states, vec![ItemState::Pending, ItemState::Pending]);

        tracker
            .run_item(&id, 1, async { Ok(item("b")) })
            .await
            .unwrap();
        tracker
            .run_item(&id, 0, async { Err(Error::Generation("rate limited".into())) })
            .await
            .unwrap();

        let status = tracker.status(&id).await.unwrap();
        assert_eq!(status.state, JobState::Done);
        assert_eq!(status.completed, 1);
        assert_eq!(status.failed, 1);
        assert_eq!(status.items[0].post_index, 2);
        assert_eq!(status.item_states, vec![ItemState::Failed, ItemState::Done]);
        assert!(status.errors[&1].contains("rate limited"));
    }

    #[tokio::test]
    async fn unknown_job_is_not_found() {
        let tracker = JobTracker::in_memory();
        assert!(matches!(
            tracker.status("nonexistent").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn fail_item_resolves_pending_slot() {
        let tracker = JobTracker::in_memory();
        let id = tracker.start(1).await.unwrap();
        tracker.fail_item(&id, 0, "no article").await.unwrap();
        let status = tracker.status(&id).await.unwrap();
        assert_eq!(status.state, JobState::Done);
        assert_eq!(status.failed, 1);
    }
}
