use std::sync::Arc;

use crate::jobs::{JobStore, WorkerPool};

/// Shared handles for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<JobStore>,
    pub pool: Arc<WorkerPool>,
    pub service_name: Arc<str>,
}

impl AppState {
    pub fn new(store: Arc<JobStore>, pool: Arc<WorkerPool>, service_name: &str) -> Self {
        Self {
            store,
            pool,
            service_name: Arc::from(service_name),
        }
    }
}
