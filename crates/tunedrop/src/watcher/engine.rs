//! Watches a folder tree and ingests audio files once they stop changing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, instrument, warn};
use walkdir::WalkDir;

use super::pending::PendingSet;
use crate::config::{is_audio_file, WatchConfig};
use crate::error::WatchError;
use crate::fingerprint::{hash_file_async, FingerprintStore};
use crate::ingest::IngestUploader;
use crate::metadata::extract_track_metadata;
use crate::sanitize::redact_path;

/// What happened to one stable path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The file disappeared before it could be read.
    Missing,
    /// The file could not be hashed this cycle; a later event re-queues it.
    HashFailed,
    /// The content was ingested before, or is being ingested right now.
    AlreadyIngested,
    Ingested { track_id: Option<String> },
    UploadFailed,
    NotConfigured,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescanSummary {
    pub scanned: usize,
    pub ingested: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RescanSummary {
    fn record(&mut self, outcome: &ProcessOutcome) {
        self.scanned += 1;
        match outcome {
            ProcessOutcome::Ingested { .. } => self.ingested += 1,
            ProcessOutcome::AlreadyIngested | ProcessOutcome::Missing => self.skipped += 1,
            ProcessOutcome::HashFailed
            | ProcessOutcome::UploadFailed
            | ProcessOutcome::NotConfigured => self.failed += 1,
        }
    }
}

pub struct FolderWatchEngine {
    root: PathBuf,
    namespace: String,
    stability: Duration,
    sweep_interval: Duration,
    fingerprints: Arc<FingerprintStore>,
    uploader: IngestUploader,
}

impl FolderWatchEngine {
    pub fn new(
        config: &WatchConfig,
        fingerprints: Arc<FingerprintStore>,
        uploader: IngestUploader,
    ) -> Self {
        // notify reports absolute paths; keep the walk in the same form.
        let root = std::path::absolute(&config.directory)
            .unwrap_or_else(|_| config.directory.clone());
        Self {
            root,
            namespace: config.namespace.clone(),
            stability: config.stability,
            sweep_interval: config.sweep_interval,
            fingerprints,
            uploader,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fingerprints(&self) -> &Arc<FingerprintStore> {
        &self.fingerprints
    }

    /// Hashes, deduplicates and ingests one file that has been stable long enough.
    ///
    /// The fingerprint is claimed for the whole check/upload/record sequence, so
    /// concurrent callers (sweep and rescan) never upload the same content twice.
    #[instrument(skip(self, path), fields(file = %redact_path(path)))]
    pub async fn process_stable(&self, path: &Path) -> ProcessOutcome {
        if !path.is_file() {
            debug!("File no longer exists");
            return ProcessOutcome::Missing;
        }

        let fingerprint = match hash_file_async(path.to_path_buf()).await {
            Ok(fp) => fp,
            Err(e) => {
                debug!("Hashing failed, will retry on next event: {}", e);
                return ProcessOutcome::HashFailed;
            }
        };

        let Some(claim) = self.fingerprints.claim(&fingerprint) else {
            debug!("Already processed");
            return ProcessOutcome::AlreadyIngested;
        };

        let metadata = extract_track_metadata(path, &self.root);
        info!(artist = %metadata.artist, title = %metadata.title, "New file detected");

        match self
            .uploader
            .ingest_file(path, &metadata, &self.namespace)
            .await
        {
            Ok(outcome) => {
                if let Err(e) = claim.commit() {
                    error!("Failed to persist fingerprint: {}", e);
                }
                ProcessOutcome::Ingested {
                    track_id: outcome.track_id,
                }
            }
            Err(e) if e.is_not_configured() => {
                warn!("Cloud storage not configured, skipping upload");
                ProcessOutcome::NotConfigured
            }
            Err(e) => {
                warn!("Upload failed: {}", e);
                ProcessOutcome::UploadFailed
            }
        }
    }

    /// Ingests every audio file under the root that is not yet known.
    pub async fn rescan(&self) -> Result<RescanSummary, WatchError> {
        let files = collect_audio_files(&self.root)?;
        info!(
            "Scanning {} audio files in {}",
            files.len(),
            self.root.display()
        );

        let mut summary = RescanSummary::default();
        for path in files {
            let outcome = self.process_stable(&path).await;
            summary.record(&outcome);
        }

        info!(
            scanned = summary.scanned,
            ingested = summary.ingested,
            skipped = summary.skipped,
            failed = summary.failed,
            "Rescan finished"
        );
        Ok(summary)
    }

    /// Starts the filesystem watcher. Create and modify events for audio files
    /// are forwarded on the returned channel; the watcher stops when dropped.
    pub fn start_watcher(
        &self,
    ) -> Result<(RecommendedWatcher, UnboundedReceiver<PathBuf>), WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let notify_err = |source| WatchError::Notify {
            path: self.root.clone(),
            source,
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        for path in event.paths.into_iter().filter(|p| is_audio_file(p)) {
                            let _ = tx.send(path);
                        }
                    }
                }
                Err(e) => warn!("Watch error: {}", e),
            }
        })
        .map_err(notify_err)?;

        watcher
            .watch(&self.root, RecursiveMode::Recursive)
            .map_err(notify_err)?;

        info!("Watching directory: {}", self.root.display());
        Ok((watcher, rx))
    }

    /// Buffers incoming paths and processes them once stable.
    ///
    /// Returns when the shutdown flag is seen on a sweep tick or the channel closes.
    pub async fn consume(&self, mut events: UnboundedReceiver<PathBuf>, shutdown: Arc<AtomicBool>) {
        let mut pending = PendingSet::new();
        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Some(path) => {
                        if pending.observe(path.clone(), Instant::now()) {
                            debug!(file = %redact_path(&path), "Queued for processing");
                        }
                    }
                    None => {
                        debug!("Event channel closed");
                        break;
                    }
                },
                _ = sweep.tick() => {
                    if shutdown.load(Ordering::Relaxed) {
                        info!("Watcher shutting down...");
                        break;
                    }
                    for path in pending.take_stable(Instant::now(), self.stability) {
                        self.process_stable(&path).await;
                    }
                }
            }
        }
    }

    /// Watches the root until `shutdown` is set.
    ///
    /// The watcher starts before the initial rescan so files that arrive during
    /// the scan are not missed.
    pub async fn run(&self, shutdown: Arc<AtomicBool>) -> Result<(), WatchError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| WatchError::CreateDirectory {
                path: self.root.clone(),
                source: e,
            })?;

        let (_watcher, events) = self.start_watcher()?;
        self.rescan().await?;
        self.consume(events, shutdown).await;

        info!("Stopped watching {}", self.root.display());
        Ok(())
    }
}

fn collect_audio_files(root: &Path) -> Result<Vec<PathBuf>, WatchError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        match entry {
            Ok(entry) => {
                if entry.file_type().is_file() && is_audio_file(entry.path()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) if e.depth() == 0 => {
                return Err(WatchError::ScanFailed {
                    path: root.to_path_buf(),
                    source: e,
                });
            }
            Err(e) => warn!("Skipping unreadable entry: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use assert_fs::TempDir;

    fn engine(root: &Path) -> FolderWatchEngine {
        let config = WatchConfig {
            enabled: true,
            directory: root.to_path_buf(),
            namespace: "tunepat".to_string(),
            processed_log: root.join(".processed.json"),
            stability: Duration::from_millis(50),
            sweep_interval: Duration::from_millis(10),
        };
        FolderWatchEngine::new(
            &config,
            Arc::new(FingerprintStore::in_memory()),
            IngestUploader::unconfigured(),
        )
    }

    #[test]
    fn test_collect_audio_files_recurses_and_filters() {
        let temp = TempDir::new().unwrap();
        temp.child("a.mp3").touch().unwrap();
        temp.child("Artist/b.FLAC").touch().unwrap();
        temp.child("cover.jpg").touch().unwrap();
        temp.child("notes.txt").touch().unwrap();

        let files = collect_audio_files(temp.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| is_audio_file(p)));
    }

    #[test]
    fn test_collect_missing_root_fails() {
        let err = collect_audio_files(Path::new("/nonexistent/tunedrop-root")).unwrap_err();
        assert!(matches!(err, WatchError::ScanFailed { .. }));
    }

    #[tokio::test]
    async fn test_missing_file_outcome() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path());
        assert_eq!(
            engine.process_stable(&temp.path().join("gone.mp3")).await,
            ProcessOutcome::Missing
        );
    }

    #[tokio::test]
    async fn test_unconfigured_upload_releases_claim() {
        let temp = TempDir::new().unwrap();
        temp.child("Artist - Title.mp3").write_binary(b"audio").unwrap();
        let engine = engine(temp.path());
        let path = temp.path().join("Artist - Title.mp3");

        assert_eq!(engine.process_stable(&path).await, ProcessOutcome::NotConfigured);
        assert!(engine.fingerprints().is_empty());
        // Released, so the next attempt tries again instead of skipping.
        assert_eq!(engine.process_stable(&path).await, ProcessOutcome::NotConfigured);
    }

    #[tokio::test]
    async fn test_already_ingested_is_skipped() {
        let temp = TempDir::new().unwrap();
        temp.child("a.wav").write_binary(b"known").unwrap();
        let engine = engine(temp.path());
        let path = temp.path().join("a.wav");
        let fp = crate::fingerprint::hash_file(&path).unwrap();
        engine.fingerprints().record(&fp).unwrap();

        assert_eq!(engine.process_stable(&path).await, ProcessOutcome::AlreadyIngested);
    }

    #[test]
    fn test_relative_root_is_made_absolute() {
        let config = WatchConfig {
            enabled: true,
            directory: PathBuf::from("music"),
            namespace: "tunepat".to_string(),
            processed_log: PathBuf::from("processed.json"),
            stability: Duration::from_millis(50),
            sweep_interval: Duration::from_millis(10),
        };
        let engine = FolderWatchEngine::new(
            &config,
            Arc::new(FingerprintStore::in_memory()),
            IngestUploader::unconfigured(),
        );
        assert!(engine.root().is_absolute());
        assert!(engine.root().ends_with("music"));
    }

    #[test]
    fn test_summary_counts_each_outcome() {
        let mut summary = RescanSummary::default();
        for outcome in [
            ProcessOutcome::Ingested { track_id: None },
            ProcessOutcome::AlreadyIngested,
            ProcessOutcome::Missing,
            ProcessOutcome::HashFailed,
            ProcessOutcome::UploadFailed,
            ProcessOutcome::NotConfigured,
        ] {
            summary.record(&outcome);
        }
        assert_eq!(
            summary,
            RescanSummary {
                scanned: 6,
                ingested: 1,
                skipped: 2,
                failed: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_consume_stops_when_channel_closes() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path());
        let (tx, rx) = mpsc::unbounded_channel();
        drop(tx);

        tokio::time::timeout(
            Duration::from_secs(5),
            engine.consume(rx, Arc::new(AtomicBool::new(false))),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_consume_stops_on_shutdown_flag() {
        let temp = TempDir::new().unwrap();
        let engine = engine(temp.path());
        let (_tx, rx) = mpsc::unbounded_channel();

        tokio::time::timeout(
            Duration::from_secs(5),
            engine.consume(rx, Arc::new(AtomicBool::new(true))),
        )
        .await
        .unwrap();
    }
}
