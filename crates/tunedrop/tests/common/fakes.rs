//! Recording fakes for the remote seams.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use tunedrop::config::AudioFormat;
use tunedrop::error::{FetchError, IngestError};
use tunedrop::remote::{
    CatalogStore, MediaFetcher, ObjectStorage, PutMode, SearchProvider, TrackPatch, TrackRecord,
};

/// What the fake fetcher does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchBehavior {
    /// Writes `{output_base}.{ext}` and returns it.
    Produce,
    /// Exits cleanly but leaves no output file.
    NoOutput,
    /// Fails as if the tool exited non-zero.
    Fail,
}

pub struct FakeFetcher {
    behavior: FetchBehavior,
    pub calls: Mutex<Vec<(String, PathBuf)>>,
}

impl FakeFetcher {
    pub fn new(behavior: FetchBehavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn locators(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(locator, _)| locator.clone())
            .collect()
    }
}

#[async_trait]
impl MediaFetcher for FakeFetcher {
    async fn fetch(
        &self,
        locator: &str,
        output_base: &Path,
        format: AudioFormat,
    ) -> Result<Option<PathBuf>, FetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((locator.to_string(), output_base.to_path_buf()));

        match self.behavior {
            FetchBehavior::Produce => {
                let mut name = output_base.as_os_str().to_owned();
                name.push(".");
                name.push(format.extension());
                let path = PathBuf::from(name);
                tokio::fs::write(&path, b"fake audio").await?;
                Ok(Some(path))
            }
            FetchBehavior::NoOutput => Ok(None),
            FetchBehavior::Fail => Err(FetchError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "ERROR: unavailable".to_string(),
            }),
        }
    }
}

/// Returns a fixed list of locators for every query.
pub struct FakeSearch {
    results: Vec<String>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn returning(results: &[&str]) -> Self {
        Self {
            results: results.iter().map(|s| s.to_string()).collect(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::returning(&[])
    }
}

#[async_trait]
impl SearchProvider for FakeSearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, FetchError> {
        self.queries.lock().unwrap().push(query.to_string());
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub path: String,
    pub content_type: String,
    pub mode: PutMode,
    pub size: usize,
}

#[derive(Default)]
pub struct RecordingStorage {
    pub objects: Mutex<Vec<StoredObject>>,
    /// When set, every put fails with this status.
    pub fail_status: Option<u16>,
}

impl RecordingStorage {
    pub fn failing(status: u16) -> Self {
        Self {
            fail_status: Some(status),
            ..Default::default()
        }
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|o| o.path.clone())
            .collect()
    }
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn put_object(
        &self,
        path: &str,
        body: Vec<u8>,
        content_type: &str,
        mode: PutMode,
    ) -> Result<(), IngestError> {
        if let Some(status) = self.fail_status {
            return Err(IngestError::UploadFailed {
                status,
                body: "storage unavailable".to_string(),
            });
        }
        self.objects.lock().unwrap().push(StoredObject {
            path: path.to_string(),
            content_type: content_type.to_string(),
            mode,
            size: body.len(),
        });
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://storage.test/public/audio/{}", path)
    }
}

#[derive(Default)]
pub struct RecordingCatalog {
    pub inserts: Mutex<Vec<TrackRecord>>,
    pub patches: Mutex<Vec<(String, TrackPatch)>>,
    pub patched: Notify,
}

#[async_trait]
impl CatalogStore for RecordingCatalog {
    async fn insert_track(&self, record: &TrackRecord) -> Result<Option<String>, IngestError> {
        let mut inserts = self.inserts.lock().unwrap();
        inserts.push(record.clone());
        Ok(Some(format!("track-{}", inserts.len())))
    }

    async fn patch_track(&self, id: &str, patch: &TrackPatch) -> Result<(), IngestError> {
        self.patches
            .lock()
            .unwrap()
            .push((id.to_string(), patch.clone()));
        self.patched.notify_one();
        Ok(())
    }
}
