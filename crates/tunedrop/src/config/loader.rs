use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::config::schema::{AudioFormat, Config, JobsConfig, ServerConfig, WatchConfig};
use crate::error::ConfigError;
use crate::secrets::{expand_home, resolve_secret_optional};

const DEFAULT_SERVICE_NAME: &str = "tunedrop";
const DEFAULT_BUCKET: &str = "audio-files";
const DEFAULT_NAMESPACE: &str = "tunepat";

/// Loads the configuration from the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from_lookup(|name| std::env::var(name).ok())
}

/// Loads the configuration through an arbitrary variable lookup.
///
/// Empty values are treated as unset.
pub fn load_config_from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    let download_dir = get("DOWNLOAD_DIR")
        .map(|p| PathBuf::from(expand_home(&p)))
        .unwrap_or_else(|| PathBuf::from("./downloads"));

    let supabase_url = get("SUPABASE_URL").map(|u| u.trim().trim_end_matches('/').to_string());
    let service_key = resolve_secret_optional(
        get("SUPABASE_SERVICE_KEY").as_deref(),
        get("SUPABASE_SERVICE_KEY_FILE").as_deref(),
    )?;

    let watch_dir = get("WATCH_DIR")
        .or_else(|| get("TUNEPAT_OUTPUT_DIR"))
        .map(|p| PathBuf::from(expand_home(&p)))
        .unwrap_or_else(default_watch_dir);

    let processed_log = get("PROCESSED_FILES_LOG")
        .map(|p| PathBuf::from(expand_home(&p)))
        .unwrap_or_else(default_processed_log);

    let download_format = match get("DOWNLOAD_FORMAT") {
        Some(value) => AudioFormat::from_name(&value).ok_or_else(|| ConfigError::InvalidValue {
            name: "DOWNLOAD_FORMAT".to_string(),
            value: value.clone(),
            reason: "expected one of wav, flac, mp3".to_string(),
        })?,
        None => AudioFormat::default(),
    };

    let jobs_defaults = JobsConfig::default();
    let jobs = JobsConfig {
        worker_count: parse_positive(&get, "WORKER_COUNT", jobs_defaults.worker_count)?,
        queue_capacity: parse_positive(&get, "QUEUE_CAPACITY", jobs_defaults.queue_capacity)?,
        max_jobs: parse_positive(&get, "MAX_JOBS", jobs_defaults.max_jobs)?,
        ttl: Duration::from_secs(parse_or(&get, "JOB_TTL_SECS", jobs_defaults.ttl.as_secs())?),
    };

    let watch = WatchConfig {
        enabled: parse_bool(&get, "WATCH_ENABLED", true)?,
        directory: watch_dir,
        namespace: get("WATCH_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
        processed_log,
        stability: Duration::from_secs(parse_or(&get, "STABILITY_SECS", 3u64)?),
        sweep_interval: Duration::from_secs(parse_positive(&get, "SWEEP_INTERVAL_SECS", 1u64)?),
    };

    let server = ServerConfig {
        bind_addr: parse_or(&get, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 5000)))?,
        service_name: get("SERVICE_NAME").unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string()),
    };

    Ok(Config {
        download_dir,
        supabase_url,
        service_key,
        upload_to_cloud: parse_bool(&get, "UPLOAD_TO_CLOUD", true)?,
        storage_bucket: get("STORAGE_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
        watch,
        server,
        jobs,
        download_format,
        ytdlp_path: get("YTDLP_PATH").unwrap_or_else(|| "yt-dlp".to_string()),
    })
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
        None => Ok(default),
    }
}

fn parse_positive<T, G>(get: &G, name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, name, default)?;
    if value <= T::default() {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: get(name).unwrap_or_default(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}

fn parse_bool<G>(get: &G, name: &str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw,
                reason: "expected a boolean".to_string(),
            }),
        },
        None => Ok(default),
    }
}

fn default_watch_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Music")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("TunePat")
}

fn default_processed_log() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tunedrop")
        .join("processed_files.json")
}
