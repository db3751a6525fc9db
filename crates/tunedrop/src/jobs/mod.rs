//! Fetch job lifecycle: request validation, tracking, execution and scheduling.

pub mod model;
pub mod orchestrator;
pub mod pool;
pub mod progress;
pub mod request;
pub mod resolver;
pub mod store;

pub use model::{JobRecord, JobStatus};
pub use orchestrator::{DownloadOrchestrator, OrchestratorSettings};
pub use pool::{JobExecutor, WorkerPool};
pub use progress::JobProgress;
pub use request::{BatchRequest, DownloadJob, DownloadRequest, JobSpec};
pub use resolver::FetchResolver;
pub use store::{JobCounts, JobStore, JobUpdate};
