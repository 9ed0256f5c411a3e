use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{new_job_id, Job, JobStore};
use crate::error::Result;
use crate::models::GeneratedItem;

/// Process-local job store; all state is lost on restart
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, total_expected: usize) -> Result<Job> {
        let job = Job::new(new_job_id(), total_expected);
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        Ok(job)
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn append(&self, job_id: &str, position: usize, item: GeneratedItem) -> Result<bool> {
        let mut jobs = self.jobs.write().await;
        Ok(jobs
            .get_mut(job_id)
            .map_or(false, |job| job.apply_item(position, item)))
    }

    async fn mark_failed(&self, job_id: &str, position: usize, reason: &str) -> Result<bool> {
        let mut jobs = self.jobs.write().await;
        Ok(jobs
            .get_mut(job_id)
            .map_or(false, |job| job.apply_failure(position, reason)))
    }

    async fn list(&self) -> Result<Vec<Job>> {
        let mut jobs: Vec<Job> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(jobs)
    }

    async fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| job.finished_at.map_or(true, |t| t >= cutoff));
        Ok(before - jobs.len())
    }
}
