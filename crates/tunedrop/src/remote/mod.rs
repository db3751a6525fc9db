//! Interfaces to the services the pipeline depends on, plus their production clients.
//!
//! The pipeline only talks to these traits; tests substitute in-memory fakes.

pub mod catalog;
pub mod fetcher;
pub mod storage;
pub mod supabase;
pub mod ytdlp;

pub use catalog::{CatalogStore, TrackPatch, TrackRecord, ANALYSIS_STATUS_UPLOADED};
pub use fetcher::{MediaFetcher, SearchProvider};
pub use storage::{ObjectStorage, PutMode};
pub use supabase::SupabaseClient;
pub use ytdlp::{locate_output, YtDlp};
