use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::config::AudioFormat;
use crate::error::FetchError;

/// External engine that downloads a locator and transcodes it to audio.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetches `locator` into `output_base` plus an engine-chosen extension.
    ///
    /// `Ok(None)` means the engine ran but no output file was found.
    async fn fetch(
        &self,
        locator: &str,
        output_base: &Path,
        format: AudioFormat,
    ) -> Result<Option<PathBuf>, FetchError>;
}

/// Turns a free-text "artist - title" query into candidate locators.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, FetchError>;
}
