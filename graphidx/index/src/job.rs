use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::{Condvar, Mutex};
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{info, warn};

use crate::error::{IndexError, IndexResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JobId(u64);

impl JobId {
    #[inline]
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    /// Finished, with the number of entries the job processed.
    Succeeded(u64),
    Failed(String),
}

impl JobStatus {
    #[inline]
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Succeeded(_) | JobStatus::Failed(_))
    }
}

/// Statuses of unfinished jobs, and of the most recently finished ones.
#[derive(Debug)]
struct JobStatuses {
    active: HashMap<JobId, JobStatus>,
    finished: LruCache<JobId, JobStatus>,
}

impl JobStatuses {
    fn get(&self, id: JobId) -> Option<&JobStatus> {
        self.active.get(&id).or_else(|| self.finished.peek(&id))
    }
}

#[derive(Debug)]
struct JobTable {
    statuses: Mutex<JobStatuses>,
    done: Condvar,
}

impl JobTable {
    fn new(finished_capacity: NonZeroUsize) -> Self {
        Self {
            statuses: Mutex::new(JobStatuses {
                active: HashMap::new(),
                finished: LruCache::new(finished_capacity),
            }),
            done: Condvar::new(),
        }
    }

    fn set(&self, id: JobId, status: JobStatus) {
        let mut statuses = self.statuses.lock();
        if status.is_finished() {
            statuses.active.remove(&id);
            statuses.finished.put(id, status);
            drop(statuses);
            self.done.notify_all();
        } else {
            statuses.active.insert(id, status);
        }
    }
}

/// Runs fire-and-forget jobs on a dedicated thread pool and records their outcome.
///
/// Only the statuses of the latest `finished_capacity` finished jobs are kept.
pub struct JobScheduler {
    pool: ThreadPool,
    next_id: AtomicU64,
    jobs: Arc<JobTable>,
}

impl JobScheduler {
    pub fn new(threads: usize, finished_capacity: usize) -> IndexResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("graphidx-job-{i}"))
            .build()
            .map_err(|e| IndexError::Scheduler(e.to_string()))?;
        Ok(Self {
            pool,
            next_id: AtomicU64::new(1),
            jobs: Arc::new(JobTable::new(
                NonZeroUsize::new(finished_capacity).unwrap_or(NonZeroUsize::MIN),
            )),
        })
    }

    /// Queues `job`. Its error, if any, is recorded as the job status and never returned to
    /// the caller.
    pub fn schedule<F>(&self, name: impl Into<String>, job: F) -> JobId
    where
        F: FnOnce() -> IndexResult<u64> + Send + 'static,
    {
        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name = name.into();
        self.jobs.set(id, JobStatus::Queued);
        let jobs = self.jobs.clone();
        self.pool.spawn(move || {
            jobs.set(id, JobStatus::Running);
            let status = match job() {
                Ok(count) => {
                    info!(job = %id, name = %name, count, "job succeeded");
                    JobStatus::Succeeded(count)
                }
                Err(e) => {
                    warn!(job = %id, name = %name, error = %e, "job failed");
                    JobStatus::Failed(e.to_string())
                }
            };
            jobs.set(id, status);
        });
        id
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        self.jobs.statuses.lock().get(id).cloned()
    }

    /// Blocks until the job finishes or `timeout` elapses, returning its latest status.
    pub fn wait(&self, id: JobId, timeout: Duration) -> Option<JobStatus> {
        let deadline = Instant::now() + timeout;
        let mut statuses = self.jobs.statuses.lock();
        loop {
            match statuses.get(id) {
                None => return None,
                Some(status) if status.is_finished() => return Some(status.clone()),
                Some(_) => {}
            }
            if self
                .jobs
                .done
                .wait_until(&mut statuses, deadline)
                .timed_out()
            {
                return statuses.get(id).cloned();
            }
        }
    }
}

impl fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobScheduler")
            .field("threads", &self.pool.current_num_threads())
            .field("next_id", &self.next_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_and_wait() {
        let scheduler = JobScheduler::new(2, 16).unwrap();
        let ok = scheduler.schedule("count", || Ok(3));
        let failed = scheduler.schedule("fail", || {
            Err(IndexError::InvariantViolation("boom".to_string()))
        });
        assert_ne!(ok, failed);

        let timeout = Duration::from_secs(10);
        assert_eq!(scheduler.wait(ok, timeout), Some(JobStatus::Succeeded(3)));
        assert!(matches!(
            scheduler.wait(failed, timeout),
            Some(JobStatus::Failed(msg)) if msg.contains("boom")
        ));
        assert_eq!(scheduler.status(JobId(999)), None);
    }

    #[test]
    fn test_finished_statuses_are_bounded() {
        let scheduler = JobScheduler::new(1, 2).unwrap();
        let timeout = Duration::from_secs(10);
        let jobs: Vec<JobId> = (0..4).map(|i| scheduler.schedule("count", move || Ok(i))).collect();
        for job in &jobs {
            scheduler.wait(*job, timeout);
        }
        assert_eq!(scheduler.jobs.statuses.lock().finished.len(), 2);
        assert!(scheduler.jobs.statuses.lock().active.is_empty());
        assert_eq!(scheduler.status(jobs[0]), None);
        assert_eq!(scheduler.status(jobs[3]), Some(JobStatus::Succeeded(3)));
    }
}
