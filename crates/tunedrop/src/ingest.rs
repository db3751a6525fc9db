//! Upload of local audio files to object storage, with catalog bookkeeping.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{content_type_for, Config};
use crate::error::IngestError;
use crate::metadata::TrackMetadata;
use crate::remote::{
    CatalogStore, ObjectStorage, PutMode, SupabaseClient, TrackPatch, TrackRecord,
    ANALYSIS_STATUS_UPLOADED,
};
use crate::sanitize::{redact_path, sanitize_object_name};

/// Storage prefix for files produced by fetch jobs.
pub const DOWNLOADS_PREFIX: &str = "downloads";

/// Where in the bucket a file lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageNamespace {
    /// `downloads/{filename}`, file name kept as is.
    Downloads,
    /// `{prefix}/{sanitized filename}` for files picked up by the watcher.
    Watch(String),
}

/// Derives the object path for `file` under `namespace`.
pub fn storage_path(namespace: &StorageNamespace, file: &Path) -> String {
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    match namespace {
        StorageNamespace::Downloads => format!("{}/{}", DOWNLOADS_PREFIX, filename),
        StorageNamespace::Watch(prefix) => {
            format!("{}/{}", prefix, sanitize_object_name(&filename))
        }
    }
}

/// Create responses that mean "object already exists".
async fn read_body(path: &Path) -> Result<Vec<u8>, IngestError> {
    tokio::fs::read(path).await.map_err(|e| IngestError::Read {
        path: path.to_path_buf(),
        source: e,
    })
}

fn is_conflict(err: &IngestError) -> bool {
    matches!(err, IngestError::UploadFailed { status: 400 | 409, .. })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedObject {
    pub url: String,
    pub storage_path: String,
}

/// Result of a full ingest (upload plus catalog insert).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub url: String,
    pub storage_path: String,
    /// `None` when the catalog insert failed or returned no id.
    pub track_id: Option<String>,
}

/// Uploads files and writes catalog rows.
///
/// Either collaborator may be absent, in which case the corresponding
/// operations return [`IngestError::NotConfigured`].
#[derive(Clone)]
pub struct IngestUploader {
    storage: Option<Arc<dyn ObjectStorage>>,
    catalog: Option<Arc<dyn CatalogStore>>,
}

impl IngestUploader {
    pub fn new(storage: Arc<dyn ObjectStorage>, catalog: Arc<dyn CatalogStore>) -> Self {
        Self {
            storage: Some(storage),
            catalog: Some(catalog),
        }
    }

    /// An uploader without credentials; every cloud operation is skipped.
    pub fn unconfigured() -> Self {
        Self {
            storage: None,
            catalog: None,
        }
    }

    /// Builds a Supabase-backed uploader when the URL and key are both set.
    pub fn from_config(config: &Config) -> Self {
        match (&config.supabase_url, &config.service_key) {
            (Some(url), Some(key)) if config.cloud_configured() => {
                let client = Arc::new(SupabaseClient::new(
                    url,
                    key.clone(),
                    &config.storage_bucket,
                ));
                Self::new(client.clone(), client)
            }
            _ => {
                warn!("Supabase credentials not configured, cloud upload disabled");
                Self::unconfigured()
            }
        }
    }

    pub fn is_configured(&self) -> bool {
        self.storage.is_some()
    }

    /// Uploads a file, retrying once as an overwrite when the object already exists.
    #[instrument(skip(self, path), fields(file = %redact_path(path)))]
    pub async fn upload_file(
        &self,
        path: &Path,
        namespace: &StorageNamespace,
    ) -> Result<UploadedObject, IngestError> {
        let storage = self.storage.as_ref().ok_or(IngestError::NotConfigured)?;

        let object_path = storage_path(namespace, path);
        let content_type = content_type_for(path);
        let body = read_body(path).await?;
        match storage
            .put_object(&object_path, body, content_type, PutMode::Create)
            .await
        {
            Ok(()) => {}
            Err(e) if is_conflict(&e) => {
                info!(storage_path = %object_path, "Object exists, retrying as upsert");
                // The first body was consumed; conflicts are rare enough to re-read.
                let body = read_body(path).await?;
                storage
                    .put_object(&object_path, body, content_type, PutMode::Upsert)
                    .await?;
            }
            Err(e) => return Err(e),
        }

        Ok(UploadedObject {
            url: storage.public_url(&object_path),
            storage_path: object_path,
        })
    }

    /// Uploads a watcher-sourced file and inserts its catalog row.
    ///
    /// A failed insert after a successful upload still counts as ingested.
    pub async fn ingest_file(
        &self,
        path: &Path,
        metadata: &TrackMetadata,
        namespace: &str,
    ) -> Result<IngestOutcome, IngestError> {
        let uploaded = self
            .upload_file(path, &StorageNamespace::Watch(namespace.to_string()))
            .await?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let record = TrackRecord {
            title: metadata.title.clone(),
            artist: metadata.artist.clone(),
            platform: namespace.to_string(),
            audio_file_path: uploaded.storage_path.clone(),
            analysis_status: ANALYSIS_STATUS_UPLOADED.to_string(),
            source_url: format!("{}://{}", namespace, filename),
        };

        let track_id = match &self.catalog {
            Some(catalog) => match catalog.insert_track(&record).await {
                Ok(id) => id,
                Err(e) => {
                    warn!(file = %filename, "File uploaded but catalog insert failed: {}", e);
                    None
                }
            },
            None => None,
        };

        info!(
            title = %metadata.title,
            track_id = track_id.as_deref().unwrap_or("-"),
            "Uploaded and added to library"
        );

        Ok(IngestOutcome {
            url: uploaded.url,
            storage_path: uploaded.storage_path,
            track_id,
        })
    }

    pub async fn patch_track(&self, id: &str, patch: &TrackPatch) -> Result<(), IngestError> {
        let catalog = self.catalog.as_ref().ok_or(IngestError::NotConfigured)?;
        catalog.patch_track(id, patch).await
    }
}
