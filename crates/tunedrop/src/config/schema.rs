use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Runtime configuration for the ingestion service.
#[derive(Debug)]
pub struct Config {
    /// Where fetch jobs write their audio files.
    pub download_dir: PathBuf,
    /// Base URL of the storage/catalog backend.
    pub supabase_url: Option<String>,
    /// Service credential for the storage/catalog backend.
    pub service_key: Option<SecretString>,
    /// Whether fetch jobs upload their result.
    pub upload_to_cloud: bool,
    pub storage_bucket: String,
    pub watch: WatchConfig,
    pub server: ServerConfig,
    pub jobs: JobsConfig,
    /// Codec requested from the fetch engine.
    pub download_format: AudioFormat,
    /// Fetch engine executable.
    pub ytdlp_path: String,
}

impl Config {
    /// True when both the backend URL and the credential are present.
    pub fn cloud_configured(&self) -> bool {
        self.supabase_url.as_deref().is_some_and(|u| !u.is_empty()) && self.service_key.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub enabled: bool,
    /// Root of the watched tree.
    pub directory: PathBuf,
    /// Storage prefix and catalog platform tag for watcher-sourced files.
    pub namespace: String,
    /// Location of the persisted fingerprint list.
    pub processed_log: PathBuf,
    /// How long a path must have been pending before it is processed.
    pub stability: Duration,
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub service_name: String,
}

#[derive(Debug, Clone)]
pub struct JobsConfig {
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub max_jobs: usize,
    pub ttl: Duration,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 64,
            max_jobs: 1000,
            ttl: Duration::from_secs(3600),
        }
    }
}

/// Codec the fetch engine is asked to produce.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    #[default]
    Wav,
    Flac,
    Mp3,
}

impl AudioFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "wav" => Some(Self::Wav),
            "flac" => Some(Self::Flac),
            "mp3" => Some(Self::Mp3),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
            Self::Flac => "flac",
            Self::Mp3 => "mp3",
        }
    }

    /// Quality argument understood by the fetch engine. `0` is best (lossless passthrough).
    pub fn quality(&self) -> &'static str {
        match self {
            Self::Wav | Self::Flac => "0",
            Self::Mp3 => "320K",
        }
    }

    /// Extensions to try, in order, when locating a fetched file.
    pub fn candidate_extensions(&self) -> Vec<&'static str> {
        let mut exts = vec![self.extension()];
        for ext in ["wav", "mp3", "m4a", "opus"] {
            if !exts.contains(&ext) {
                exts.push(ext);
            }
        }
        exts
    }
}

/// Audio file types accepted by the watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioExtension {
    Mp3,
    Flac,
    Wav,
    M4a,
    Aac,
    Ogg,
    Opus,
}

impl AudioExtension {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "mp3" => Some(Self::Mp3),
            "flac" => Some(Self::Flac),
            "wav" => Some(Self::Wav),
            "m4a" => Some(Self::M4a),
            "aac" => Some(Self::Aac),
            "ogg" => Some(Self::Ogg),
            "opus" => Some(Self::Opus),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Flac => "audio/flac",
            Self::Wav => "audio/wav",
            Self::M4a => "audio/mp4",
            Self::Aac => "audio/aac",
            Self::Ogg => "audio/ogg",
            Self::Opus => "audio/opus",
        }
    }
}

/// Content type used when the extension is not a known audio type.
pub const DEFAULT_AUDIO_CONTENT_TYPE: &str = "audio/mpeg";

/// Content type for an upload, derived from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    AudioExtension::from_path(path)
        .map(|ext| ext.content_type())
        .unwrap_or(DEFAULT_AUDIO_CONTENT_TYPE)
}

pub fn is_audio_file(path: &Path) -> bool {
    AudioExtension::from_path(path).is_some()
}
