//! Job records as reported by `/status`.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a fetch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Searching,
    Downloading,
    Processing,
    Uploading,
    Complete,
    Error,
}

impl JobStatus {
    /// Progress marker for the phase. `Error` carries none.
    pub fn progress(&self) -> Option<u8> {
        match self {
            JobStatus::Queued => Some(0),
            JobStatus::Searching => Some(10),
            JobStatus::Downloading => Some(30),
            JobStatus::Processing => Some(70),
            JobStatus::Uploading => Some(85),
            JobStatus::Complete => Some(100),
            JobStatus::Error => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobStatus::Queued => "queued",
            JobStatus::Searching => "searching",
            JobStatus::Downloading => "downloading",
            JobStatus::Processing => "processing",
            JobStatus::Uploading => "uploading",
            JobStatus::Complete => "complete",
            JobStatus::Error => "error",
        };
        f.write_str(name)
    }
}

/// Full state of one job. Updates replace the whole record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    /// Set on completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Set when the upload succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_url: Option<String>,
    /// Catalog record patched with the uploaded file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<String>,
    /// Set on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobRecord {
    /// A non-terminal record for `status` with its progress marker.
    pub fn phase(status: JobStatus) -> Self {
        Self {
            status,
            progress: status.progress(),
            local_path: None,
            filename: None,
            cloud_url: None,
            track_id: None,
            error: None,
        }
    }

    pub fn queued() -> Self {
        Self::phase(JobStatus::Queued)
    }

    pub fn complete(local_path: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            local_path: Some(local_path.into()),
            filename: Some(filename.into()),
            ..Self::phase(JobStatus::Complete)
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::phase(JobStatus::Error)
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
