use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Web server
    pub web_host: String,
    pub web_port: u16,

    // Sessions
    pub session_secret: String,
    pub admin_password: String,

    // Storage
    pub saves_root: PathBuf,
    pub export_dir: PathBuf,

    // Persistence tunables
    pub autosave_secs: u64,
    pub max_document_bytes: usize,
    pub max_raster_bytes: usize,
}

/// Default flush interval for dirty documents, in seconds.
pub const DEFAULT_AUTOSAVE_SECS: u64 = 30;

/// Default ceiling for a serialized world document or an uploaded map raster.
pub const DEFAULT_MAX_BYTES: usize = 3 * 1024 * 1024;

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            web_host: env::var("WEB_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            web_port: env::var("WEB_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .expect("WEB_PORT must be a number"),
            session_secret: required_env("SESSION_SECRET"),
            admin_password: required_env("ADMIN_PASSWORD"),
            saves_root: env::var("SAVES_ROOT")
                .unwrap_or_else(|_| "saves".to_string())
                .into(),
            export_dir: env::var("EXPORT_DIR")
                .unwrap_or_else(|_| "exports".to_string())
                .into(),
            autosave_secs: env::var("AUTOSAVE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_AUTOSAVE_SECS),
            max_document_bytes: env::var("MAX_DOCUMENT_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_BYTES),
            max_raster_bytes: env::var("MAX_RASTER_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_BYTES),
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}
