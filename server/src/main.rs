use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{error, info, warn};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use tunedrop::remote::YtDlp;
use tunedrop::{
    load_config, run_server, AppState, Config, DownloadOrchestrator, FetchResolver,
    FingerprintStore, FolderWatchEngine, IngestUploader, JobStore, OrchestratorSettings,
    TunedropError, WorkerPool,
};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    let installed = if json {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .finish(),
        )
    } else {
        tracing::subscriber::set_global_default(
            tracing_subscriber::fmt().with_env_filter(filter).finish(),
        )
    };
    if let Err(e) = installed {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }

    // Route `log` records from the library into tracing.
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to install log bridge: {}", e);
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

fn spawn_watcher(
    config: &Config,
    uploader: IngestUploader,
    shutdown: Arc<AtomicBool>,
) -> Result<Option<JoinHandle<()>>, TunedropError> {
    if !config.watch.enabled {
        info!("Folder watcher disabled");
        return Ok(None);
    }
    if !uploader.is_configured() {
        warn!("Folder watcher needs cloud storage credentials, not starting it");
        return Ok(None);
    }

    let fingerprints = Arc::new(FingerprintStore::open(config.watch.processed_log.clone())?);

    let engine = FolderWatchEngine::new(&config.watch, fingerprints, uploader);
    Ok(Some(tokio::spawn(async move {
        if let Err(e) = engine.run(shutdown).await {
            error!("Folder watcher stopped: {}", e);
        }
    })))
}

async fn run() -> Result<(), TunedropError> {
    let config = load_config()?;

    info!("Starting tunedrop v{}", env!("CARGO_PKG_VERSION"));
    info!("Download directory: {}", config.download_dir.display());
    info!("Cloud upload: {}", config.upload_to_cloud);

    if let Err(e) = tokio::fs::create_dir_all(&config.download_dir).await {
        warn!(
            "Could not create download directory {}: {}",
            config.download_dir.display(),
            e
        );
    }

    let uploader = IngestUploader::from_config(&config);
    let ytdlp = Arc::new(YtDlp::new(config.ytdlp_path.clone()));
    let store = Arc::new(JobStore::from_config(&config.jobs));

    let orchestrator = Arc::new(DownloadOrchestrator::new(
        Arc::clone(&store),
        FetchResolver::new(ytdlp.clone()),
        ytdlp,
        uploader.clone(),
        OrchestratorSettings::from_config(&config),
    ));
    let pool = Arc::new(WorkerPool::new(
        orchestrator,
        config.jobs.worker_count,
        config.jobs.queue_capacity,
    ));

    let shutdown = Arc::new(AtomicBool::new(false));
    let watcher = spawn_watcher(&config, uploader, Arc::clone(&shutdown))?;

    let state = AppState::new(
        Arc::clone(&store),
        Arc::clone(&pool),
        &config.server.service_name,
    );
    run_server(state, config.server.bind_addr, shutdown_signal()).await?;

    shutdown.store(true, Ordering::Relaxed);
    pool.shutdown();
    pool.wait().await;

    if let Some(handle) = watcher {
        if let Err(e) = handle.await {
            error!("Watcher task panicked: {:?}", e);
        }
    }

    let counts = store.counts();
    info!(
        "Stopped ({} complete, {} failed, {} unfinished)",
        counts.complete, counts.error, counts.active
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_logging();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
