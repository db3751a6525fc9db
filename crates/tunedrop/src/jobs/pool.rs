use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::{debug, error, info};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use super::request::DownloadJob;
use crate::error::PoolError;

/// Runs one queued job to a terminal state.
#[async_trait]
pub trait JobExecutor: Send + Sync + 'static {
    async fn run_job(&self, job_id: String, job: DownloadJob);
}

struct QueuedJob {
    job_id: String,
    job: DownloadJob,
}

type SharedReceiver = Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>;

/// Fixed set of worker tasks pulling from a bounded queue.
///
/// `submit` never waits: a full queue is reported as [`PoolError::QueueFull`].
pub struct WorkerPool {
    job_sender: Mutex<Option<mpsc::Sender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawns `worker_count` workers on the current runtime.
    ///
    /// # Panics
    /// Panics if `worker_count` or `queue_capacity` is 0.
    pub fn new(executor: Arc<dyn JobExecutor>, worker_count: usize, queue_capacity: usize) -> Self {
        assert!(worker_count > 0, "worker_count must be > 0");
        let (job_sender, job_receiver) = mpsc::channel::<QueuedJob>(queue_capacity);
        let job_receiver: SharedReceiver = Arc::new(tokio::sync::Mutex::new(job_receiver));

        let workers = (0..worker_count)
            .map(|worker_id| {
                let receiver = Arc::clone(&job_receiver);
                let executor = Arc::clone(&executor);
                tokio::spawn(run_worker(worker_id, receiver, executor))
            })
            .collect();

        info!(
            "Started {} workers (queue capacity {})",
            worker_count, queue_capacity
        );

        Self {
            job_sender: Mutex::new(Some(job_sender)),
            workers: Mutex::new(workers),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queues a job without waiting for space.
    pub fn submit(&self, job_id: String, job: DownloadJob) -> Result<(), PoolError> {
        if self.shutdown.load(Ordering::Relaxed) {
            return Err(PoolError::Closed);
        }

        let guard = match self.job_sender.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        let sender = guard.as_ref().ok_or(PoolError::Closed)?;

        sender
            .try_send(QueuedJob { job_id, job })
            .map_err(|e| match e {
                TrySendError::Full(rejected) => {
                    debug!("Queue full, rejecting job {}", rejected.job_id);
                    PoolError::QueueFull
                }
                TrySendError::Closed(_) => PoolError::Closed,
            })
    }

    /// Stops accepting jobs. Queued jobs are still drained by the workers.
    pub fn shutdown(&self) {
        info!("Shutting down worker pool...");
        self.shutdown.store(true, Ordering::Relaxed);
        let mut guard = match self.job_sender.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }

    /// Waits for every worker to exit. Call after [`WorkerPool::shutdown`].
    pub async fn wait(&self) {
        let workers: Vec<JoinHandle<()>> = match self.workers.lock() {
            Ok(mut g) => g.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };

        for (i, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                error!("Worker {} panicked: {:?}", i, e);
            } else {
                debug!("Worker {} finished", i);
            }
        }

        info!("All workers have stopped");
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}

async fn run_worker(worker_id: usize, receiver: SharedReceiver, executor: Arc<dyn JobExecutor>) {
    debug!("Worker {} started", worker_id);

    loop {
        let next = receiver.lock().await.recv().await;
        match next {
            Some(queued) => {
                debug!("Worker {} processing job {}", worker_id, queued.job_id);
                executor.run_job(queued.job_id, queued.job).await;
            }
            None => {
                debug!("Worker {} job channel closed", worker_id);
                break;
            }
        }
    }

    debug!("Worker {} stopped", worker_id);
}
