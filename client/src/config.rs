use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:9000";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// Base URL of the query backend.
/// - `GEOQUERY_BACKEND_URL` when set
/// - otherwise http://localhost:9000
pub fn backend_base_url() -> String {
    env::var("GEOQUERY_BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string())
}

pub fn poll_interval() -> Duration {
    parse_interval(env::var("GEOQUERY_POLL_INTERVAL_MS").ok().as_deref())
}

/// Where the local storage file lives. `None` when the platform has no data
/// dir and nothing was configured; identities are then kept in memory only.
pub fn state_dir() -> Option<PathBuf> {
    match env::var_os("GEOQUERY_STATE_DIR") {
        Some(dir) => Some(PathBuf::from(dir)),
        None => dirs::data_local_dir().map(|d| d.join("geoquery")),
    }
}

/// Milliseconds, zero and garbage fall back to the default period.
pub fn parse_interval(raw: Option<&str>) -> Duration {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_POLL_INTERVAL)
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub poll_interval: Duration,
    pub state_dir: Option<PathBuf>,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            base_url: backend_base_url(),
            poll_interval: poll_interval(),
            state_dir: state_dir(),
        }
    }
}
