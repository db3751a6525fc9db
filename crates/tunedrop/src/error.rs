use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TunedropError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),

    #[error("Fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),

    #[error("Worker pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Failed to resolve secret: {0}")]
    Secret(#[from] crate::secrets::SecretError),
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Track not found on YouTube")]
    NotFound,
}

/// Reasons a fetch job ends in `error`. The display text is the job's error message.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Download failed")]
    DownloadFailed,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to create download directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the external fetch engine itself.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Fetch engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Search provider failed: {0}")]
    Search(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Cloud storage is not configured")]
    NotConfigured,

    #[error("Upload failed with status {status}: {body}")]
    UploadFailed { status: u16, body: String },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog write failed with status {status}: {body}")]
    Catalog { status: u16, body: String },
}

impl IngestError {
    /// True when the cloud step should be skipped rather than reported as a failure.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, IngestError::NotConfigured)
    }
}

#[derive(Error, Debug)]
pub enum FingerprintError {
    #[error("Failed to read fingerprint file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse fingerprint file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to write fingerprint file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to watch '{path}': {source}")]
    Notify {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("Directory scan failed for '{path}': {source}")]
    ScanFailed {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Download queue is full")]
    QueueFull,

    #[error("Worker pool is shut down")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TunedropError>;
