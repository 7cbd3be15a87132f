//! Background job queue.
//!
//! Top-level operations are submitted as jobs and polled for their status,
//! so callers never block on device I/O unless they choose to wait.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

pub type JobId = String;

/// Work run on the queue. The returned value becomes the job result.
pub type Job = Box<dyn FnOnce(&JobContext) -> Result<serde_json::Value> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// Point-in-time view of a job.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub task_id: JobId,
    pub name: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Handed to a running job.
pub struct JobContext {
    id: JobId,
    name: String,
}

impl JobContext {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Asynchronous job submission and status polling.
pub trait JobQueue: Send + Sync {
    fn submit(&self, name: &str, job: Job) -> Result<JobId>;

    fn poll(&self, id: &str) -> Option<JobSnapshot>;
}

type Table = Arc<Mutex<HashMap<JobId, JobSnapshot>>>;

/// Finished snapshots kept for polling before the oldest are evicted.
const DEFAULT_RETENTION: usize = 256;

/// Job queue backed by a bounded rayon pool.
///
/// Pending and running jobs are always tracked. Finished snapshots beyond
/// the retention limit are dropped oldest first when a new job is submitted.
pub struct PoolQueue {
    pool: rayon::ThreadPool,
    jobs: Table,
    retention: usize,
}

impl PoolQueue {
    pub fn new(workers: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("job-worker-{i}"))
            .build()
            .context("Failed to create job pool")?;
        Ok(Self {
            pool,
            jobs: Arc::new(Mutex::new(HashMap::new())),
            retention: DEFAULT_RETENTION,
        })
    }
}

/// Drop the oldest finished snapshots until at most `keep` remain.
fn evict_finished(jobs: &mut HashMap<JobId, JobSnapshot>, keep: usize) {
    let mut finished: Vec<_> = jobs
        .values()
        .filter_map(|s| s.finished_at.map(|at| (at, s.task_id.clone())))
        .collect();
    if finished.len() <= keep {
        return;
    }
    finished.sort();
    let excess = finished.len() - keep;
    for (_, id) in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
    log::debug!("Evicted {excess} finished jobs");
}

fn update(jobs: &Table, id: &str, f: impl FnOnce(&mut JobSnapshot)) {
    let mut jobs = jobs.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(snapshot) = jobs.get_mut(id) {
        f(snapshot);
    }
}

impl JobQueue for PoolQueue {
    fn submit(&self, name: &str, job: Job) -> Result<JobId> {
        let id = uuid::Uuid::new_v4().to_string();
        let snapshot = JobSnapshot {
            task_id: id.clone(),
            name: name.to_string(),
            status: JobStatus::Pending,
            result: None,
            error: None,
            submitted_at: Utc::now(),
            finished_at: None,
        };
        {
            let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
            evict_finished(&mut jobs, self.retention);
            jobs.insert(id.clone(), snapshot);
        }
        log::debug!("Submitted job {name} ({id})");

        let jobs = Arc::clone(&self.jobs);
        let ctx = JobContext {
            id: id.clone(),
            name: name.to_string(),
        };
        self.pool.spawn(move || {
            update(&jobs, &ctx.id, |s| s.status = JobStatus::Running);

            let outcome = match catch_unwind(AssertUnwindSafe(|| job(&ctx))) {
                Ok(outcome) => outcome,
                Err(_) => Err(anyhow::anyhow!("job panicked")),
            };

            update(&jobs, &ctx.id, |s| {
                s.finished_at = Some(Utc::now());
                match outcome {
                    Ok(value) => {
                        s.status = JobStatus::Succeeded;
                        s.result = Some(value);
                    }
                    Err(e) => {
                        log::error!("Job {} ({}) failed: {:#}", ctx.name, ctx.id, e);
                        s.status = JobStatus::Failed;
                        s.error = Some(format!("{e:#}"));
                    }
                }
            });
        });

        Ok(id)
    }

    fn poll(&self, id: &str) -> Option<JobSnapshot> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }
}

/// Poll until the job finishes. `None` if the queue does not know the id.
pub fn wait(queue: &dyn JobQueue, id: &str, interval: Duration) -> Option<JobSnapshot> {
    loop {
        let snapshot = queue.poll(id)?;
        if snapshot.status.is_finished() {
            return Some(snapshot);
        }
        thread::sleep(interval);
    }
}
