//! Test harness for isolated orchestrator and API runs.
//!
//! The `TestHarness` owns a temporary download directory and wires a real
//! `DownloadOrchestrator` and `JobStore` to recording fakes, so tests can drive
//! jobs end to end and inspect every state transition.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tempfile::TempDir;

use tunedrop::config::AudioFormat;
use tunedrop::jobs::{DownloadJob, JobUpdate};
use tunedrop::{
    make_app, AppState, DownloadOrchestrator, DownloadRequest, FetchResolver, IngestUploader,
    JobRecord, JobStore, OrchestratorSettings, WorkerPool,
};

use super::fakes::{FakeFetcher, FakeSearch, FetchBehavior, RecordingCatalog, RecordingStorage};

/// Cloud side of the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cloud {
    /// No credentials; uploads report not-configured.
    Off,
    /// Uploads and catalog writes succeed and are recorded.
    Recording,
    /// Every upload fails with the given HTTP status.
    Failing(u16),
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub download_dir: PathBuf,
    pub store: Arc<JobStore>,
    pub fetcher: Arc<FakeFetcher>,
    pub search: Arc<FakeSearch>,
    pub storage: Arc<RecordingStorage>,
    pub catalog: Arc<RecordingCatalog>,
    pub orchestrator: Arc<DownloadOrchestrator>,
}

impl TestHarness {
    /// Fetches succeed, search finds one video, uploads are recorded.
    pub fn new() -> Self {
        Self::with(
            FetchBehavior::Produce,
            FakeSearch::returning(&["https://www.youtube.com/watch?v=abc123"]),
            Cloud::Recording,
        )
    }

    pub fn with(fetch: FetchBehavior, search: FakeSearch, cloud: Cloud) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let download_dir = temp_dir.path().join("downloads");

        let store = Arc::new(JobStore::default());
        let fetcher = Arc::new(FakeFetcher::new(fetch));
        let search = Arc::new(search);
        let storage = Arc::new(match cloud {
            Cloud::Failing(status) => RecordingStorage::failing(status),
            _ => RecordingStorage::default(),
        });
        let catalog = Arc::new(RecordingCatalog::default());

        let uploader = match cloud {
            Cloud::Off => IngestUploader::unconfigured(),
            _ => IngestUploader::new(storage.clone(), catalog.clone()),
        };
        let settings = OrchestratorSettings {
            download_dir: download_dir.clone(),
            format: AudioFormat::Wav,
            upload_to_cloud: true,
        };
        let orchestrator = Arc::new(DownloadOrchestrator::new(
            Arc::clone(&store),
            FetchResolver::new(search.clone()),
            fetcher.clone(),
            uploader,
            settings,
        ));

        Self {
            temp_dir,
            download_dir,
            store,
            fetcher,
            search,
            storage,
            catalog,
            orchestrator,
        }
    }

    /// Parses a request body the way the API does.
    pub fn request(body: Value) -> DownloadRequest {
        serde_json::from_value(body).expect("valid download request")
    }

    /// Runs one job inline and returns its id with every record it went through.
    pub async fn run(&self, request: DownloadRequest) -> (String, Vec<JobRecord>) {
        let mut updates = self.store.subscribe();
        let job_id = self.store.create();
        self.orchestrator
            .run(&job_id, DownloadJob::from(request))
            .await;

        let mut history = Vec::new();
        while let Ok(JobUpdate { job_id: id, record }) = updates.try_recv() {
            if id == job_id {
                history.push(record);
            }
        }
        (job_id, history)
    }

    /// An API app backed by the harness orchestrator.
    pub fn app(&self, workers: usize, queue_capacity: usize) -> (axum::Router, AppState) {
        let pool = Arc::new(WorkerPool::new(
            self.orchestrator.clone(),
            workers,
            queue_capacity,
        ));
        let state = AppState::new(Arc::clone(&self.store), pool, "tunedrop-test");
        (make_app(state.clone()), state)
    }
}
