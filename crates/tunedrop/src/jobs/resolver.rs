//! Resolution of a job spec to a locator the fetch engine understands.

use std::sync::Arc;

use tracing::{debug, warn};

use super::request::JobSpec;
use crate::error::ResolveError;
use crate::remote::SearchProvider;

pub struct FetchResolver {
    search: Arc<dyn SearchProvider>,
}

impl FetchResolver {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self { search }
    }

    /// Direct specs resolve to their own url; search specs take the first
    /// result for `"{artist} - {title}"`. Provider failures count as not found.
    pub async fn resolve(&self, spec: &JobSpec) -> Result<String, ResolveError> {
        match spec {
            JobSpec::Direct { url } => Ok(url.clone()),
            JobSpec::Search { artist, title, .. } => {
                let query = format!("{} - {}", artist, title);
                debug!(query = %query, "Searching for track");

                match self.search.search(&query, 1).await {
                    Ok(candidates) => candidates.into_iter().next().ok_or(ResolveError::NotFound),
                    Err(e) => {
                        warn!(query = %query, "Search failed: {}", e);
                        Err(ResolveError::NotFound)
                    }
                }
            }
        }
    }
}
