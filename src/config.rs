use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    #[serde(default)]
    pub lock: LockConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub janitor: JanitorConfig,
}

/// Record lock protocol tuning
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LockConfig {
    /// How often a waiter re-reads a held record
    pub poll_interval_ms: u64,
    /// Hard wall-clock budget for one acquire
    pub timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            timeout_ms: 10_000,
        }
    }
}

/// Journal store location and durability
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    pub journal_path: String,
    /// fsync every write; leave off unless the deployment demands it
    pub sync_on_write: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            journal_path: "data/records.journal".to_string(),
            sync_on_write: false,
        }
    }
}

/// Stale-lock sweeper schedule
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JanitorConfig {
    pub scan_interval_secs: u64,
    /// Must comfortably exceed the lock timeout, or the sweeper could
    /// break a lock a live handler still holds
    pub stale_threshold_secs: u64,
    pub batch_size: usize,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: 30,
            stale_threshold_secs: 60,
            batch_size: 100,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Self {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|_| panic!("Failed to read config file: {}", config_path));
        serde_yaml::from_str(&content).expect("Failed to parse config yaml")
    }
}
