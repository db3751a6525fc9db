//! Folder watcher: filesystem events in, stable audio files ingested once.

pub mod engine;
pub mod pending;

pub use engine::{FolderWatchEngine, ProcessOutcome, RescanSummary};
pub use pending::PendingSet;
