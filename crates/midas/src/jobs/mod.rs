//! C10: owns the `job_id -> Job` map, single-writer-by-worker status
//! transitions, and the at-most-one-running-sync semaphore.

use crate::pipelines::xiaohongshu::{SyncProgress, XiaohongshuPipeline};
use chrono::{DateTime, Utc};
use midas_models::{Job, JobKind, JobStatus, MidasError};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const TERMINAL_JOB_LRU_CAPACITY: usize = 256;
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

struct JobTable {
    jobs: HashMap<String, Job>,
    terminal_order: VecDeque<String>,
}

/// Reported at `GET /api/xiaohongshu/sync/cooldown` (spec §6).
#[derive(Debug, Clone, serde::Serialize)]
pub struct CooldownStatus {
    pub allowed: bool,
    pub remaining_seconds: u64,
    pub next_allowed_at_epoch: i64,
}

/// Creates, runs, reports, and reaps long-running sync jobs (spec §4.10).
/// `xhs_collection_sync` is single-flight across the process via a
/// counting semaphore of 1, and additionally gated by a minimum
/// interval between sync starts (`xiaohongshu.min_live_sync_interval_seconds`).
pub struct JobManager {
    table: Mutex<JobTable>,
    xhs_semaphore: Arc<Semaphore>,
    last_xhs_sync_started_at: Mutex<Option<DateTime<Utc>>>,
}

impl JobManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(JobTable {
                jobs: HashMap::new(),
                terminal_order: VecDeque::new(),
            }),
            xhs_semaphore: Arc::new(Semaphore::new(1)),
            last_xhs_sync_started_at: Mutex::new(None),
        })
    }

    /// The cooldown window's current status, independent of whether a
    /// sync is running right now.
    pub async fn cooldown_status(&self, min_interval_seconds: u64) -> CooldownStatus {
        let last = *self.last_xhs_sync_started_at.lock().await;
        match last {
            None => CooldownStatus {
                allowed: true,
                remaining_seconds: 0,
                next_allowed_at_epoch: Utc::now().timestamp(),
            },
            Some(last_started) => {
                let elapsed = (Utc::now() - last_started).num_seconds().max(0) as u64;
                let remaining = min_interval_seconds.saturating_sub(elapsed);
                CooldownStatus {
                    allowed: remaining == 0,
                    remaining_seconds: remaining,
                    next_allowed_at_epoch: (last_started.timestamp() + min_interval_seconds as i64),
                }
            }
        }
    }

    /// Submits a collection sync. Fails synchronously with
    /// `RATE_LIMITED` if one is already running, or if the minimum
    /// sync interval hasn't elapsed yet (spec §4.10 concurrency rule).
    #[instrument(skip(self, pipeline))]
    pub async fn submit_xhs_collection_sync(
        self: &Arc<Self>,
        requested_limit: u32,
        min_interval_seconds: u64,
        pipeline: Arc<XiaohongshuPipeline>,
    ) -> Result<String, MidasError> {
        let cooldown = self.cooldown_status(min_interval_seconds).await;
        if !cooldown.allowed {
            return Err(MidasError::rate_limited(
                "a xiaohongshu collection sync ran too recently",
                cooldown.remaining_seconds,
            ));
        }

        let permit = Arc::clone(&self.xhs_semaphore)
            .try_acquire_owned()
            .map_err(|_| MidasError::rate_limited("a xiaohongshu collection sync is already running", 0))?;

        *self.last_xhs_sync_started_at.lock().await = Some(Utc::now());

        let job_id = Uuid::new_v4().to_string();
        let job = Job::new_pending(job_id.clone(), JobKind::XhsCollectionSync, requested_limit);
        self.insert(job).await;

        let manager = Arc::clone(self);
        let spawned_job_id = job_id.clone();
        tokio::spawn(async move {
            manager.run_xhs_job(spawned_job_id, requested_limit, pipeline, permit).await;
        });

        Ok(job_id)
    }

    pub async fn get(&self, job_id: &str) -> Option<Job> {
        self.table.lock().await.jobs.get(job_id).cloned()
    }

    async fn insert(&self, job: Job) {
        self.table.lock().await.jobs.insert(job.job_id.clone(), job);
    }

    async fn run_xhs_job(
        self: Arc<Self>,
        job_id: String,
        requested_limit: u32,
        pipeline: Arc<XiaohongshuPipeline>,
        _permit: OwnedSemaphorePermit,
    ) {
        self.mark_running(&job_id).await;

        let (tx, mut rx) = mpsc::channel::<SyncProgress>(PROGRESS_CHANNEL_CAPACITY);
        let drain_manager = Arc::clone(&self);
        let drain_job_id = job_id.clone();
        let drain_handle = tokio::spawn(async move {
            while let Some(progress) = rx.recv().await {
                drain_manager.apply_progress(&drain_job_id, progress).await;
            }
        });

        let outcome = pipeline.run_collection_sync(requested_limit, tx).await;
        let _ = drain_handle.await;

        match outcome {
            Ok(result) => self.finish_succeeded(&job_id, result).await,
            Err(e) => {
                warn!(job_id, error = %e, "xiaohongshu collection sync job failed");
                self.finish_failed(&job_id, e.message).await;
            }
        }
    }

    async fn mark_running(&self, job_id: &str) {
        let mut table = self.table.lock().await;
        if let Some(job) = table.jobs.get_mut(job_id) {
            job.status = JobStatus::Running;
            job.message = "running".to_string();
            job.updated_at = chrono::Utc::now();
        }
    }

    async fn apply_progress(&self, job_id: &str, progress: SyncProgress) {
        let mut table = self.table.lock().await;
        if let Some(job) = table.jobs.get_mut(job_id) {
            job.current = progress.current;
            job.total = progress.total;
            job.message = progress.message;
            job.updated_at = chrono::Utc::now();
        }
    }

    async fn finish_succeeded(&self, job_id: &str, result: midas_models::SyncResult) {
        let mut table = self.table.lock().await;
        if let Some(job) = table.jobs.get_mut(job_id) {
            job.status = JobStatus::Succeeded;
            job.current = result.new_count;
            job.message = if result.circuit_opened {
                "completed with circuit breaker tripped".to_string()
            } else {
                "completed".to_string()
            };
            job.result = Some(result);
            job.updated_at = chrono::Utc::now();
        }
        info!(job_id, "job terminal: succeeded");
        Self::retain_terminal(&mut table, job_id);
    }

    async fn finish_failed(&self, job_id: &str, message: String) {
        let mut table = self.table.lock().await;
        if let Some(job) = table.jobs.get_mut(job_id) {
            job.status = JobStatus::Failed;
            job.error = Some(message);
            job.updated_at = chrono::Utc::now();
        }
        Self::retain_terminal(&mut table, job_id);
    }

    /// Marks every job still `running` at shutdown as `failed`, so no
    /// job is left mid-flight across a process restart (spec §5).
    pub async fn abandon_running_jobs(&self, reason: &str) {
        let mut table = self.table.lock().await;
        let running_ids: Vec<String> = table
            .jobs
            .iter()
            .filter(|(_, j)| j.status == JobStatus::Running || j.status == JobStatus::Pending)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &running_ids {
            if let Some(job) = table.jobs.get_mut(id) {
                job.status = JobStatus::Failed;
                job.error = Some(reason.to_string());
                job.updated_at = chrono::Utc::now();
            }
        }
        for id in running_ids {
            Self::retain_terminal(&mut table, &id);
        }
    }

    fn retain_terminal(table: &mut JobTable, job_id: &str) {
        table.terminal_order.push_back(job_id.to_string());
        while table.terminal_order.len() > TERMINAL_JOB_LRU_CAPACITY {
            if let Some(evicted) = table.terminal_order.pop_front() {
                table.jobs.remove(&evicted);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_missing_job_is_none() {
        let manager = JobManager::new();
        assert!(manager.get("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn lru_eviction_bounds_terminal_jobs() {
        let manager = JobManager::new();
        {
            let mut table = manager.table.lock().await;
            for i in 0..(TERMINAL_JOB_LRU_CAPACITY + 5) {
                let id = format!("job-{i}");
                table
                    .jobs
                    .insert(id.clone(), Job::new_pending(id.clone(), JobKind::XhsCollectionSync, 1));
                JobManager::retain_terminal(&mut table, &id);
            }
        }
        let table = manager.table.lock().await;
        assert_eq!(table.jobs.len(), TERMINAL_JOB_LRU_CAPACITY);
    }
}
