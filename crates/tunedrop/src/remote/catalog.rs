use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Ingestion status written to catalog records once their audio is stored.
pub const ANALYSIS_STATUS_UPLOADED: &str = "uploaded";

/// A new catalog row for an ingested file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    pub artist: String,
    pub platform: String,
    pub audio_file_path: String,
    pub analysis_status: String,
    pub source_url: String,
}

/// Fields updated on an existing catalog row after a fetch job uploads its file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPatch {
    pub audio_file_path: String,
    pub analysis_status: String,
}

impl TrackPatch {
    pub fn uploaded(audio_file_path: impl Into<String>) -> Self {
        Self {
            audio_file_path: audio_file_path.into(),
            analysis_status: ANALYSIS_STATUS_UPLOADED.to_string(),
        }
    }
}

/// The track catalog. The pipeline creates and patches rows but does not own the schema.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Inserts a row and returns its id when the backend reports one.
    async fn insert_track(&self, record: &TrackRecord) -> Result<Option<String>, IngestError>;

    async fn patch_track(&self, id: &str, patch: &TrackPatch) -> Result<(), IngestError>;
}
