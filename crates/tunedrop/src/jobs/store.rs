//! In-memory job tracker with bounded retention.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::model::{JobRecord, JobStatus};
use crate::config::JobsConfig;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Emitted on every create and update.
#[derive(Debug, Clone)]
pub struct JobUpdate {
    pub job_id: String,
    pub record: JobRecord,
}

/// Number of tracked jobs per state group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub active: usize,
    pub complete: usize,
    pub error: usize,
}

struct JobEntry {
    record: JobRecord,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Map from job id to the job's latest record.
///
/// Terminal jobs are evicted once older than the TTL, and the oldest terminal
/// jobs go first when the store is at capacity. Running jobs are never evicted.
pub struct JobStore {
    jobs: RwLock<HashMap<String, JobEntry>>,
    sender: broadcast::Sender<JobUpdate>,
    max_jobs: usize,
    ttl: Duration,
}

impl JobStore {
    pub fn new(max_jobs: usize, ttl: Duration) -> Self {
        let (sender, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            jobs: RwLock::new(HashMap::new()),
            sender,
            max_jobs: max_jobs.max(1),
            ttl,
        }
    }

    pub fn from_config(config: &JobsConfig) -> Self {
        Self::new(config.max_jobs, config.ttl)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, JobEntry>> {
        match self.jobs.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, JobEntry>> {
        match self.jobs.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Registers a new job in `queued` state and returns its id.
    pub fn create(&self) -> String {
        let job_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let record = JobRecord::queued();

        {
            let mut jobs = self.write();
            self.purge(&mut jobs, now);
            jobs.insert(
                job_id.clone(),
                JobEntry {
                    record: record.clone(),
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        let _ = self.sender.send(JobUpdate {
            job_id: job_id.clone(),
            record,
        });
        job_id
    }

    /// Replaces a job's record. Returns false if the id is unknown (never created or evicted).
    pub fn update(&self, job_id: &str, record: JobRecord) -> bool {
        {
            let mut jobs = self.write();
            match jobs.get_mut(job_id) {
                Some(entry) => {
                    entry.record = record.clone();
                    entry.updated_at = Utc::now();
                }
                None => {
                    warn!("Ignoring update for unknown job {}", job_id);
                    return false;
                }
            }
        }

        let _ = self.sender.send(JobUpdate {
            job_id: job_id.to_string(),
            record,
        });
        true
    }

    pub fn get(&self, job_id: &str) -> Option<JobRecord> {
        self.read().get(job_id).map(|entry| entry.record.clone())
    }

    /// When the job was registered.
    pub fn created_at(&self, job_id: &str) -> Option<DateTime<Utc>> {
        self.read().get(job_id).map(|entry| entry.created_at)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobUpdate> {
        self.sender.subscribe()
    }

    pub fn counts(&self) -> JobCounts {
        self.read()
            .values()
            .fold(JobCounts::default(), |mut counts, entry| {
                match entry.record.status {
                    JobStatus::Complete => counts.complete += 1,
                    JobStatus::Error => counts.error += 1,
                    _ => counts.active += 1,
                }
                counts
            })
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired terminal jobs, then the oldest terminal jobs until a new one fits.
    fn purge(&self, jobs: &mut HashMap<String, JobEntry>, now: DateTime<Utc>) {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let before = jobs.len();

        jobs.retain(|_, entry| !entry.record.is_terminal() || now - entry.updated_at < ttl);

        if jobs.len() >= self.max_jobs {
            let mut terminal: Vec<(String, DateTime<Utc>)> = jobs
                .iter()
                .filter(|(_, entry)| entry.record.is_terminal())
                .map(|(id, entry)| (id.clone(), entry.updated_at))
                .collect();
            terminal.sort_by_key(|(_, updated_at)| *updated_at);

            let excess = jobs.len() + 1 - self.max_jobs;
            for (id, _) in terminal.into_iter().take(excess) {
                jobs.remove(&id);
            }

            if jobs.len() >= self.max_jobs {
                warn!(
                    "Job store holds {} running jobs, above the limit of {}",
                    jobs.len(),
                    self.max_jobs
                );
            }
        }

        let evicted = before - jobs.len();
        if evicted > 0 {
            debug!("Evicted {} finished jobs", evicted);
        }
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::from_config(&JobsConfig::default())
    }
}
