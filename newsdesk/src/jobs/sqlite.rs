use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::collections::BTreeMap;

use super::{new_job_id, ItemState, Job, JobStore};
use crate::error::{Error, Result};
use crate::models::GeneratedItem;

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS jobs (
        id TEXT PRIMARY KEY,
        total_expected INTEGER NOT NULL,
        created_at TEXT NOT NULL,
        finished_at TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_slots (
        job_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        state TEXT NOT NULL DEFAULT 'pending',
        error TEXT,
        PRIMARY KEY (job_id, position)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS job_items (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        job_id TEXT NOT NULL,
        position INTEGER NOT NULL,
        item_json TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_job_items_job ON job_items (job_id, seq)",
];

/// Job store backed by SQLite; jobs survive restarts until evicted
#[derive(Clone)]
pub struct SqliteJobStore {
    pool: SqlitePool,
}

impl SqliteJobStore {
    /// Wrap `pool` and create the job tables if needed.
    pub async fn new(pool: SqlitePool) -> Result<Self> {
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Resolve one pending slot and, inside the same transaction, record the
    /// item and close the job if it was the last one.
    async fn resolve(
        &self,
        job_id: &str,
        position: usize,
        outcome: ItemState,
        error: Option<&str>,
        item: Option<&GeneratedItem>,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE job_slots SET state = ?, error = ? WHERE job_id = ? AND position = ? AND state = 'pending'",
        )
        .bind(outcome.as_str())
        .bind(error)
        .bind(job_id)
        .bind(position as i64)
        .execute(&mut tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(item) = item {
            sqlx::query("INSERT INTO job_items (job_id, position, item_json) VALUES (?, ?, ?)")
                .bind(job_id)
                .bind(position as i64)
                .bind(serde_json::to_string(item)?)
                .execute(&mut tx)
                .await?;
        }

        let pending = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM job_slots WHERE job_id = ? AND state = 'pending'",
        )
        .bind(job_id)
        .fetch_one(&mut tx)
        .await?;

        if pending == 0 {
            sqlx::query("UPDATE jobs SET finished_at = ? WHERE id = ? AND finished_at IS NULL")
                .bind(Utc::now())
                .bind(job_id)
                .execute(&mut tx)
                .await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait::async_trait]
impl JobStore for SqliteJobStore {
    async fn create(&self, total_expected: usize) -> Result<Job> {
        let job = Job::new(new_job_id(), total_expected);
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO jobs (id, total_expected, created_at, finished_at) VALUES (?, ?, ?, ?)")
            .bind(&job.id)
            .bind(total_expected as i64)
            .bind(job.created_at)
            .bind(job.finished_at)
            .execute(&mut tx)
            .await?;

        for position in 0..total_expected {
            sqlx::query("INSERT INTO job_slots (job_id, position, state) VALUES (?, ?, 'pending')")
                .bind(&job.id)
                .bind(position as i64)
                .execute(&mut tx)
                .await?;
        }

        tx.commit().await?;
        Ok(job)
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>> {
        // one snapshot: a concurrent append must not land between the reads
        let mut tx = self.pool.begin().await?;
        let Some(row) = sqlx::query(
            "SELECT id, total_expected, created_at, finished_at FROM jobs WHERE id = ?",
        )
        .bind(job_id)
        .fetch_optional(&mut tx)
        .await?
        else {
            return Ok(None);
        };

        let total_expected = row.try_get::<i64, _>("total_expected")?.max(0) as usize;
        let mut job = Job {
            id: row.try_get("id")?,
            total_expected,
            items: Vec::new(),
            item_states: vec![ItemState::Pending; total_expected],
            errors: BTreeMap::new(),
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
            finished_at: row.try_get::<Option<DateTime<Utc>>, _>("finished_at")?,
        };

        let slots = sqlx::query("SELECT position, state, error FROM job_slots WHERE job_id = ? ORDER BY position")
            .bind(job_id)
            .fetch_all(&mut tx)
            .await?;
        for slot in slots {
            let position = slot.try_get::<i64, _>("position")? as usize;
            let state: String = slot.try_get("state")?;
            let state = ItemState::parse(&state)
                .ok_or_else(|| Error::Store(format!("unknown slot state '{}'", state)))?;
            if let Some(s) = job.item_states.get_mut(position) {
                *s = state;
            }
            if let Some(error) = slot.try_get::<Option<String>, _>("error")? {
                job.errors.insert(position, error);
            }
        }

        let items = sqlx::query_scalar::<_, String>(
            "SELECT item_json FROM job_items WHERE job_id = ? ORDER BY seq",
        )
        .bind(job_id)
        .fetch_all(&mut tx)
        .await?;
        tx.commit().await?;

        for raw in items {
            job.items.push(serde_json::from_str(&raw)?);
        }

        Ok(Some(job))
    }

    async fn append(&self, job_id: &str, position: usize, item: GeneratedItem) -> Result<bool> {
        self.resolve(job_id, position, ItemState::Done, None, Some(&item)).await
    }

    async fn mark_failed(&self, job_id: &str, position: usize, reason: &str) -> Result<bool> {
        self.resolve(job_id, position, ItemState::Failed, Some(reason), None).await
    }

    async fn list(&self) -> Result<Vec<Job>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM jobs ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(job) = self.get(&id).await? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }

    async fn evict_finished_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        const EXPIRED: &str = "SELECT id FROM jobs WHERE finished_at IS NOT NULL AND finished_at < ?";

        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DELETE FROM job_items WHERE job_id IN ({})", EXPIRED))
            .bind(cutoff)
            .execute(&mut tx)
            .await?;
        sqlx::query(&format!("DELETE FROM job_slots WHERE job_id IN ({})", EXPIRED))
            .bind(cutoff)
            .execute(&mut tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM jobs WHERE finished_at IS NOT NULL AND finished_at < ?")
            .bind(cutoff)
            .execute(&mut tx)
            .await?;
        tx.commit().await?;

        Ok(deleted.rows_affected() as usize)
    }
}
