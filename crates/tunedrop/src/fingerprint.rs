//! Content fingerprints and the persisted set of already-ingested files.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use sha2::{Digest, Sha256};

use crate::error::FingerprintError;

/// Read size used while hashing. Only affects throughput.
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Computes the SHA-256 of a file's content, streamed in fixed-size chunks.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hashes a file on the blocking pool.
pub async fn hash_file_async(path: PathBuf) -> io::Result<String> {
    tokio::task::spawn_blocking(move || hash_file(&path))
        .await
        .map_err(io::Error::other)?
}

#[derive(Default)]
struct FingerprintSet {
    processed: HashSet<String>,
    /// Fingerprints whose upload is currently in progress.
    in_flight: HashSet<String>,
}

/// Persisted set of fingerprints for files that were ingested successfully.
///
/// The on-disk form is a flat JSON array, rewritten after every addition.
/// Uploads are serialized per fingerprint through [`FingerprintStore::claim`].
pub struct FingerprintStore {
    path: Option<PathBuf>,
    set: Mutex<FingerprintSet>,
}

impl FingerprintStore {
    /// Opens (or starts) the fingerprint list at `path`.
    ///
    /// A missing file is an empty set; an unreadable or malformed file is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FingerprintError> {
        let path = path.into();
        let processed = match std::fs::read_to_string(&path) {
            Ok(content) if content.trim().is_empty() => HashSet::new(),
            Ok(content) => {
                let entries: Vec<String> =
                    serde_json::from_str(&content).map_err(|e| FingerprintError::Parse {
                        path: path.clone(),
                        source: e,
                    })?;
                entries.into_iter().collect()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                return Err(FingerprintError::Read {
                    path: path.clone(),
                    source: e,
                })
            }
        };

        info!(
            "Loaded {} processed fingerprints from {}",
            processed.len(),
            path.display()
        );

        Ok(Self {
            path: Some(path),
            set: Mutex::new(FingerprintSet {
                processed,
                in_flight: HashSet::new(),
            }),
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            set: Mutex::new(FingerprintSet::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.lock().processed.contains(fingerprint)
    }

    pub fn len(&self) -> usize {
        self.lock().processed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Adds a fingerprint and persists the list.
    ///
    /// Returns `Ok(false)` if it was already present (nothing is written).
    pub fn record(&self, fingerprint: &str) -> Result<bool, FingerprintError> {
        let mut set = self.lock();
        if !set.processed.insert(fingerprint.to_string()) {
            return Ok(false);
        }
        self.persist(&set.processed)?;
        Ok(true)
    }

    /// Reserves a fingerprint for ingestion.
    ///
    /// Returns `None` when it is already recorded or another caller holds it.
    /// The reservation is released when the claim is dropped without
    /// [`FingerprintClaim::commit`].
    pub fn claim(self: &Arc<Self>, fingerprint: &str) -> Option<FingerprintClaim> {
        let mut set = self.lock();
        if set.processed.contains(fingerprint) || set.in_flight.contains(fingerprint) {
            return None;
        }
        set.in_flight.insert(fingerprint.to_string());
        Some(FingerprintClaim {
            store: Arc::clone(self),
            fingerprint: fingerprint.to_string(),
            committed: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, FingerprintSet> {
        match self.set.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Fingerprint set lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Writes the list to a sibling temp file and renames it into place.
    fn persist(&self, processed: &HashSet<String>) -> Result<(), FingerprintError> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut entries: Vec<&String> = processed.iter().collect();
        entries.sort();
        let write_err = |source| FingerprintError::Write {
            path: path.clone(),
            source,
        };

        let json = serde_json::to_string(&entries)
            .map_err(|e| write_err(io::Error::other(e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(write_err)?;
        std::fs::rename(&tmp, path).map_err(write_err)?;

        debug!("Persisted {} fingerprints to {}", entries.len(), path.display());
        Ok(())
    }
}

/// Exclusive right to ingest one fingerprint.
pub struct FingerprintClaim {
    store: Arc<FingerprintStore>,
    fingerprint: String,
    committed: bool,
}

impl FingerprintClaim {
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Marks the fingerprint as ingested and persists the list.
    ///
    /// The fingerprint stays recorded in memory even if persisting fails.
    pub fn commit(mut self) -> Result<(), FingerprintError> {
        self.committed = true;
        let mut set = self.store.lock();
        set.in_flight.remove(&self.fingerprint);
        set.processed.insert(self.fingerprint.clone());
        self.store.persist(&set.processed)
    }
}

impl Drop for FingerprintClaim {
    fn drop(&mut self) {
        if !self.committed {
            self.store.lock().in_flight.remove(&self.fingerprint);
        }
    }
}

impl std::fmt::Debug for FingerprintClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintClaim")
            .field("fingerprint", &self.fingerprint)
            .field("committed", &self.committed)
            .finish()
    }
}
