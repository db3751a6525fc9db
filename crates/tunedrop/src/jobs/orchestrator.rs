//! Drives one fetch job from `queued` to a terminal state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, info_span, warn, Instrument};

use super::model::{JobRecord, JobStatus};
use super::pool::JobExecutor;
use super::progress::JobProgress;
use super::request::DownloadJob;
use super::resolver::FetchResolver;
use super::store::JobStore;
use crate::config::{AudioFormat, Config};
use crate::error::JobError;
use crate::ingest::{IngestUploader, StorageNamespace};
use crate::remote::{MediaFetcher, TrackPatch};
use crate::sanitize::{output_stem, redact_path};

/// Orchestrator settings taken from [`Config`].
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub download_dir: PathBuf,
    pub format: AudioFormat,
    pub upload_to_cloud: bool,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            download_dir: config.download_dir.clone(),
            format: config.download_format,
            upload_to_cloud: config.upload_to_cloud,
        }
    }
}

pub struct DownloadOrchestrator {
    store: Arc<JobStore>,
    resolver: FetchResolver,
    fetcher: Arc<dyn MediaFetcher>,
    uploader: IngestUploader,
    settings: OrchestratorSettings,
}

impl DownloadOrchestrator {
    pub fn new(
        store: Arc<JobStore>,
        resolver: FetchResolver,
        fetcher: Arc<dyn MediaFetcher>,
        uploader: IngestUploader,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            resolver,
            fetcher,
            uploader,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<JobStore> {
        &self.store
    }

    /// Runs the job to completion, recording every phase in the store.
    pub async fn run(&self, job_id: &str, job: DownloadJob) {
        let span = info_span!("download_job", job_id = %job_id);
        async {
            let progress = JobProgress::new(job_id, Arc::clone(&self.store));
            match self.process(&progress, &job).await {
                Ok(record) => {
                    info!(
                        filename = record.filename.as_deref().unwrap_or_default(),
                        uploaded = record.cloud_url.is_some(),
                        "Download complete"
                    );
                    progress.completed(record);
                }
                Err(e) => {
                    warn!("Download failed: {}", e);
                    progress.failed(&e.to_string());
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn process(
        &self,
        progress: &JobProgress,
        job: &DownloadJob,
    ) -> Result<JobRecord, JobError> {
        if job.spec.is_search() {
            progress.update_phase(JobStatus::Searching);
        }
        let locator = self.resolver.resolve(&job.spec).await?;

        progress.update_phase(JobStatus::Downloading);
        let download_dir = &self.settings.download_dir;
        tokio::fs::create_dir_all(download_dir)
            .await
            .map_err(|e| JobError::CreateDirectory {
                path: download_dir.clone(),
                source: e,
            })?;

        let stem =
            output_stem(&job.artist, &job.title).unwrap_or_else(|| progress.job_id().to_string());
        let output_base = download_dir.join(stem);

        let local_path = self
            .fetcher
            .fetch(&locator, &output_base, self.settings.format)
            .await?
            .ok_or(JobError::DownloadFailed)?;

        progress.update_phase(JobStatus::Processing);
        let filename = redact_path(&local_path);
        let mut record = JobRecord::complete(local_path.to_string_lossy(), filename);

        if self.settings.upload_to_cloud {
            progress.update_phase(JobStatus::Uploading);
            self.upload(&local_path, job, &mut record).await;
        }

        Ok(record)
    }

    /// Upload failures never fail the job; the record just lacks `cloud_url`.
    async fn upload(&self, local_path: &Path, job: &DownloadJob, record: &mut JobRecord) {
        match self
            .uploader
            .upload_file(local_path, &StorageNamespace::Downloads)
            .await
        {
            Ok(uploaded) => {
                record.cloud_url = Some(uploaded.url);
                if let Some(track_id) = &job.track_id {
                    record.track_id = Some(track_id.clone());
                    self.spawn_patch(track_id.clone(), uploaded.storage_path);
                }
            }
            Err(e) if e.is_not_configured() => {
                info!("Cloud storage not configured, keeping local file only");
            }
            Err(e) => warn!("Upload failed, keeping local file only: {}", e),
        }
    }

    fn spawn_patch(&self, track_id: String, storage_path: String) {
        let uploader = self.uploader.clone();
        tokio::spawn(
            async move {
                match uploader
                    .patch_track(&track_id, &TrackPatch::uploaded(storage_path))
                    .await
                {
                    Ok(()) => info!("Track record updated"),
                    Err(e) => warn!("Failed to update track record: {}", e),
                }
            }
            .instrument(info_span!("patch_track")),
        );
    }
}

#[async_trait]
impl JobExecutor for DownloadOrchestrator {
    async fn run_job(&self, job_id: String, job: DownloadJob) {
        self.run(&job_id, job).await
    }
}
