use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use recast_engines::EngineConfig;

use crate::jobs::RetryPolicy;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub engines: EngineConfig,

    #[serde(default)]
    pub formats: FormatsConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory conversion artifacts are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// How long artifacts and job records are kept, in seconds (default: 3600)
    #[serde(default = "default_retention")]
    pub retention_secs: u64,

    /// How often the artifact sweeper runs, in seconds (default: 300)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("recast")
}
fn default_retention() -> u64 {
    3600
}
fn default_sweep_interval() -> u64 {
    300
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            retention_secs: default_retention(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl StorageConfig {
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueueConfig {
    /// Number of conversion workers (0 = one per CPU core)
    #[serde(default)]
    pub workers: usize,

    /// Bounded queue capacity; submit blocks once it is full (default: 100)
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    100
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            capacity: default_capacity(),
        }
    }
}

impl QueueConfig {
    pub fn worker_count(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Attempts per job, the first one included (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds; doubles per attempt (default: 10000)
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay() -> u64 {
    10_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FormatsConfig {
    /// Path to a custom format table (TOML); the built-in table is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}
