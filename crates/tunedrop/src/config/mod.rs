pub mod loader;
pub mod schema;

pub use loader::{load_config, load_config_from_lookup};
pub use schema::{
    content_type_for, is_audio_file, AudioExtension, AudioFormat, Config, JobsConfig,
    ServerConfig, WatchConfig, DEFAULT_AUDIO_CONTENT_TYPE,
};
