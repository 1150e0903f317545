//! Environment-driven configuration: a plain struct with a `Default`
//! impl and a `from_env()` constructor reading documented environment
//! variables with sensible fallbacks.

use std::env;

/// Delivery worker tunables.
///
/// Environment variables:
/// - `MISSION_CONTROL_CLAIM_LIMIT` — max notifications claimed per tick (default: 20)
/// - `MISSION_CONTROL_MAX_ATTEMPTS` — delivering attempts before dead-lettering (default: 3, floor 1)
/// - `MISSION_CONTROL_RETRY_DELAY_MS` — flat backoff between retries (default: 30000, floor 1000)
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    pub limit: i64,
    pub max_attempts: i64,
    pub retry_delay_ms: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            limit: 20,
            max_attempts: 3,
            retry_delay_ms: 30_000,
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("MISSION_CONTROL_CLAIM_LIMIT")
            && let Ok(n) = val.parse::<i64>()
        {
            config.limit = n.max(1);
        }
        if let Ok(val) = env::var("MISSION_CONTROL_MAX_ATTEMPTS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.max_attempts = n.max(1);
        }
        if let Ok(val) = env::var("MISSION_CONTROL_RETRY_DELAY_MS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.retry_delay_ms = n.max(1000);
        }

        config
    }
}

/// Resolves the database path: explicit argument, else
/// `MISSION_CONTROL_DB_PATH`, else the conventional default. Creates the
/// parent directory if absent.
pub fn resolve_db_path(explicit: Option<&str>) -> String {
    let path = explicit
        .map(String::from)
        .or_else(|| env::var("MISSION_CONTROL_DB_PATH").ok())
        .unwrap_or_else(|| "./data/mission_control.db".to_string());

    if let Some(parent) = std::path::Path::new(&path).parent() {
        std::fs::create_dir_all(parent).ok();
    }

    path
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
