pub mod api;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod ingest;
pub mod jobs;
pub mod metadata;
pub mod remote;
pub mod sanitize;
pub mod secrets;
pub mod watcher;

pub use api::{make_app, run_server, AppState};
pub use config::{load_config, Config};
pub use error::{
    ConfigError, FetchError, FingerprintError, IngestError, JobError, PoolError, ResolveError,
    Result, TunedropError, WatchError,
};
pub use fingerprint::{hash_file, FingerprintClaim, FingerprintStore};
pub use ingest::{IngestOutcome, IngestUploader, StorageNamespace};
pub use jobs::{
    DownloadOrchestrator, DownloadRequest, FetchResolver, JobRecord, JobStatus, JobStore,
    OrchestratorSettings, WorkerPool,
};
pub use metadata::{extract_track_metadata, TrackMetadata};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use watcher::{FolderWatchEngine, ProcessOutcome, RescanSummary};
