use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Storage location and connection pool settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file. Parent directories are created on open.
    pub path: PathBuf,
    /// Maximum number of pooled connections.
    pub pool_size: usize,
    /// How long a connection waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("jsonvault.db"),
            pool_size: 10,
            busy_timeout_ms: 5_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = StoreConfig::default();
        assert_eq!(c.path, PathBuf::from("jsonvault.db"));
        assert_eq!(c.pool_size, 10);
        assert_eq!(c.busy_timeout(), Duration::from_secs(5));
    }
}
