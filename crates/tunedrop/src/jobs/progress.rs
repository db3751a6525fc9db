//! Per-job handle that writes phase changes into the tracker.

use std::sync::Arc;

use log::debug;

use super::model::{JobRecord, JobStatus};
use super::store::JobStore;

/// Tracks progress for a single job.
///
/// Only the task running the job holds one, so records for a job are written
/// by a single writer and progress never moves backwards.
pub struct JobProgress {
    job_id: String,
    store: Arc<JobStore>,
}

impl JobProgress {
    pub fn new(job_id: &str, store: Arc<JobStore>) -> Self {
        Self {
            job_id: job_id.to_string(),
            store,
        }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Moves the job into a non-terminal phase.
    pub fn update_phase(&self, status: JobStatus) {
        debug!("Job {} -> {}", self.job_id, status);
        self.store.update(&self.job_id, JobRecord::phase(status));
    }

    /// Writes the final record of a successful job.
    pub fn completed(&self, record: JobRecord) {
        debug!("Job {} complete", self.job_id);
        self.store.update(&self.job_id, record);
    }

    /// Marks the job as failed with an error message.
    pub fn failed(&self, error: &str) {
        debug!("Job {} failed: {}", self.job_id, error);
        self.store.update(&self.job_id, JobRecord::failed(error));
    }
}
