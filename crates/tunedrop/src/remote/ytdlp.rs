//! `yt-dlp` as fetch engine and search provider.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use super::fetcher::{MediaFetcher, SearchProvider};
use crate::config::AudioFormat;
use crate::error::FetchError;
use crate::sanitize::redact_path;

const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Lines of stderr kept when the engine fails.
const STDERR_TAIL_LINES: usize = 5;

/// Finds the file the engine produced for `output_base`, probing the requested
/// codec's extension first and then the usual fallbacks.
pub fn locate_output(output_base: &Path, format: AudioFormat) -> Option<PathBuf> {
    format
        .candidate_extensions()
        .into_iter()
        .map(|ext| {
            let mut name = OsString::from(output_base.as_os_str());
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        })
        .find(|candidate| candidate.is_file())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

fn parse_search_ids(stdout: &str, max_results: usize) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|id| !id.is_empty() && !id.contains(char::is_whitespace))
        .take(max_results)
        .map(|id| format!("{}{}", WATCH_URL_PREFIX, id))
        .collect()
}

/// Arguments for an audio extraction run. The locator comes from clients, so it
/// always follows `--` and can never be read as an option.
fn fetch_args(locator: &str, output_base: &Path, format: AudioFormat) -> Vec<OsString> {
    let mut template = OsString::from(output_base.as_os_str());
    template.push(".%(ext)s");

    vec![
        "-x".into(),
        "--audio-format".into(),
        format.extension().into(),
        "--audio-quality".into(),
        format.quality().into(),
        "--no-playlist".into(),
        "-o".into(),
        template,
        "--".into(),
        locator.into(),
    ]
}

/// Runs the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run(&self, args: &[OsString]) -> Result<Output, FetchError> {
        Command::new(&self.program)
            .args(args)
            .output()
            .await
            .map_err(|e| FetchError::Spawn {
                program: self.program.clone(),
                source: e,
            })
    }
}

impl Default for YtDlp {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl MediaFetcher for YtDlp {
    #[instrument(skip(self, output_base), fields(output = %redact_path(output_base)))]
    async fn fetch(
        &self,
        locator: &str,
        output_base: &Path,
        format: AudioFormat,
    ) -> Result<Option<PathBuf>, FetchError> {
        let output = self.run(&fetch_args(locator, output_base, format)).await?;
        if !output.status.success() {
            return Err(FetchError::Failed {
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }

        let located = locate_output(output_base, format);
        debug!(found = located.is_some(), "Fetch engine finished");
        Ok(located)
    }
}

#[async_trait]
impl SearchProvider for YtDlp {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<String>, FetchError> {
        let args: Vec<OsString> = vec![
            "--flat-playlist".into(),
            "--print".into(),
            "id".into(),
            "--".into(),
            format!("ytsearch{}:{}", max_results.max(1), query).into(),
        ];

        let output = self.run(&args).await?;
        if !output.status.success() {
            return Err(FetchError::Search(stderr_tail(&output.stderr)));
        }

        Ok(parse_search_ids(
            &String::from_utf8_lossy(&output.stdout),
            max_results,
        ))
    }
}
