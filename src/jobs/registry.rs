//! In-memory job registry.
//!
//! Each job has a single writer (its worker); readers take snapshot copies
//! so they never observe a partial stage transition. Insert and delete
//! require the write lock; status updates go through guarded helpers that
//! enforce terminal immutability and monotone progress.

use super::{CancelToken, Job, JobStatus};
use crate::ids::JobId;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info, warn};

struct JobEntry {
    job: Job,
    cancel: CancelToken,
}

/// Process-wide registry of jobs.
#[derive(Default)]
pub struct JobRegistry {
    entries: RwLock<HashMap<String, JobEntry>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly created job; returns its cancel token.
    pub fn insert(&self, job: Job) -> CancelToken {
        let cancel = CancelToken::new();
        let mut entries = self.entries.write().expect("registry lock poisoned");
        entries.insert(
            job.id.as_str().to_string(),
            JobEntry {
                job,
                cancel: cancel.clone(),
            },
        );
        cancel
    }

    /// Snapshot copy of a job.
    pub fn snapshot(&self, id: &JobId) -> Option<Job> {
        let entries = self.entries.read().expect("registry lock poisoned");
        entries.get(id.as_str()).map(|e| e.job.clone())
    }

    /// Cancel token for a job, if it exists.
    pub fn cancel_token(&self, id: &JobId) -> Option<CancelToken> {
        let entries = self.entries.read().expect("registry lock poisoned");
        entries.get(id.as_str()).map(|e| e.cancel.clone())
    }

    /// Request cooperative cancellation. Succeeds (true) whether or not the
    /// job has already terminated; false only for unknown ids.
    pub fn request_cancel(&self, id: &JobId) -> bool {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        match entries.get_mut(id.as_str()) {
            Some(entry) => {
                entry.cancel.cancel();
                // a queued job has no worker to honor the flag; finish it here
                if entry.job.status == JobStatus::Queued {
                    entry.job.status = JobStatus::Cancelled;
                    entry.job.ended_at = Some(Utc::now());
                }
                info!(job_id = %id, "Cancellation requested");
                true
            }
            None => false,
        }
    }

    /// Apply a mutation to a live (non-terminal) job. Progress can only
    /// grow; mutations against terminal jobs are dropped.
    pub fn update<F>(&self, id: &JobId, mutate: F)
    where
        F: FnOnce(&mut Job),
    {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        if let Some(entry) = entries.get_mut(id.as_str()) {
            if entry.job.status.is_terminal() {
                debug!(job_id = %id, "Dropping update to terminal job");
                return;
            }
            let floor = entry.job.progress;
            mutate(&mut entry.job);
            if entry.job.progress < floor {
                entry.job.progress = floor;
            }
        }
    }

    /// Transition a job's status, honoring the state machine. Returns
    /// whether the transition was applied.
    pub fn transition(&self, id: &JobId, next: JobStatus) -> bool {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        let Some(entry) = entries.get_mut(id.as_str()) else {
            return false;
        };
        if !entry.job.status.can_transition_to(next) {
            warn!(
                job_id = %id,
                from = %entry.job.status,
                to = %next,
                "Rejected status transition"
            );
            return false;
        }
        entry.job.status = next;
        match next {
            JobStatus::Running => entry.job.started_at = Some(Utc::now()),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => {
                entry.job.ended_at = Some(Utc::now());
            }
            JobStatus::Queued => {}
        }
        true
    }

    /// List snapshots, newest first, with pagination and optional status
    /// filter.
    pub fn list(&self, limit: usize, offset: usize, status: Option<JobStatus>) -> Vec<Job> {
        let entries = self.entries.read().expect("registry lock poisoned");
        let mut jobs: Vec<Job> = entries
            .values()
            .map(|e| e.job.clone())
            .filter(|j| status.is_none_or(|s| j.status == s))
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.into_iter().skip(offset).take(limit).collect()
    }

    /// Remove a job record, returning it for file cleanup.
    pub fn remove(&self, id: &JobId) -> Option<Job> {
        let mut entries = self.entries.write().expect("registry lock poisoned");
        entries.remove(id.as_str()).map(|e| {
            e.cancel.cancel();
            e.job
        })
    }

    /// Remove terminal jobs older than `ttl_seconds`, returning them so the
    /// caller can delete their directories.
    pub fn sweep_expired(&self, ttl_seconds: u64) -> Vec<Job> {
        let cutoff = Utc::now() - chrono::Duration::seconds(ttl_seconds as i64);
        let mut entries = self.entries.write().expect("registry lock poisoned");
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, e)| {
                e.job.status.is_terminal() && e.job.ended_at.is_some_and(|t| t < cutoff)
            })
            .map(|(id, _)| id.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|id| entries.remove(&id).map(|e| e.job))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
