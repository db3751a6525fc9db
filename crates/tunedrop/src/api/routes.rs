use std::future::Future;
use std::net::SocketAddr;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use super::state::AppState;
use crate::error::PoolError;
use crate::jobs::{BatchRequest, DownloadJob, DownloadRequest, JobRecord};

#[derive(Serialize)]
struct QueuedResponse {
    job_id: String,
    status: &'static str,
}

#[derive(Serialize)]
struct BatchJob {
    job_id: String,
    title: Option<String>,
}

#[derive(Serialize)]
struct BatchResponse {
    jobs: Vec<BatchJob>,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Parses a body that must be a non-empty JSON object.
fn parse_object(body: &Bytes) -> Option<Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => Some(Value::Object(map)),
        _ => None,
    }
}

/// Registers a job and hands it to the pool. A rejected job is settled to
/// `error` right away so it never lingers as `queued`.
fn enqueue(state: &AppState, request: DownloadRequest) -> (String, Result<(), PoolError>) {
    let job_id = state.store.create();
    let job = DownloadJob::from(request);

    let submitted = state.pool.submit(job_id.clone(), job);
    if let Err(e) = &submitted {
        warn!(job_id = %job_id, "Job rejected: {}", e);
        state.store.update(&job_id, JobRecord::failed(e.to_string()));
    }
    (job_id, submitted)
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "status": "ok", "service": &*state.service_name }))
}

async fn start_download(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(value) = parse_object(&body) else {
        return error_response(StatusCode::BAD_REQUEST, "No data provided");
    };
    let request: DownloadRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("Invalid request: {}", e))
        }
    };

    match enqueue(&state, request) {
        (job_id, Ok(())) => {
            info!(job_id = %job_id, "Download queued");
            Json(QueuedResponse {
                job_id,
                status: "queued",
            })
            .into_response()
        }
        (_, Err(PoolError::QueueFull)) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Download queue is full")
        }
        (_, Err(e)) => error_response(StatusCode::SERVICE_UNAVAILABLE, &e.to_string()),
    }
}

async fn get_status(State(state): State<AppState>, Path(job_id): Path<String>) -> Response {
    match state.store.get(&job_id) {
        Some(record) => Json(record).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Job not found"),
    }
}

async fn batch_download(State(state): State<AppState>, body: Bytes) -> Response {
    let batch = match serde_json::from_slice::<BatchRequest>(&body) {
        Ok(batch) => batch,
        Err(_) if parse_object(&body).is_none() => BatchRequest::default(),
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("Invalid request: {}", e))
        }
    };
    if batch.tracks.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No tracks provided");
    }

    let jobs: Vec<BatchJob> = batch
        .tracks
        .into_iter()
        .map(|track| {
            let title = track.title.clone();
            let (job_id, _) = enqueue(&state, track);
            BatchJob { job_id, title }
        })
        .collect();

    info!("Queued batch of {} downloads", jobs.len());
    Json(BatchResponse { jobs }).into_response()
}

pub fn make_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/download", post(start_download))
        .route("/status/{job_id}", get(get_status))
        .route("/batch", post(batch_download))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serves the API on `addr` until `shutdown` resolves.
pub async fn run_server<F>(state: AppState, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = make_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
