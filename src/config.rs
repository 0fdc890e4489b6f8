use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub worker: WorkerConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    /// Parallelism hint for the bucket-sort step only; has no effect on the
    /// sequential fetch/append loop.
    #[serde(default = "default_threading_number")]
    pub threading_number: usize,
    /// Rotation threshold in whole gigabytes of accumulated buffer data.
    pub file_gb_size_threshold: u64,
    /// Parameterizes the randomized min/max bounds sent with each fetch.
    pub threshold_for_objects: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub buffer_path: String,
    pub output_dir: String,
}

const DEFAULT_THREADING_NUMBER: usize = 1;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

fn default_threading_number() -> usize {
    DEFAULT_THREADING_NUMBER
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref())?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Config = toml::from_str(raw)?;
        if config.api.host.trim().is_empty() {
            anyhow::bail!("api.host cannot be empty");
        }
        if config.api.port == 0 {
            anyhow::bail!("api.port cannot be 0");
        }
        if config.worker.file_gb_size_threshold == 0 {
            anyhow::bail!("worker.file_gb_size_threshold must be at least 1");
        }
        // The fetch ranges [1, t) and [t+1, 2t) are empty below 2.
        if config.worker.threshold_for_objects < 2 {
            anyhow::bail!("worker.threshold_for_objects must be at least 2");
        }
        if config.storage.buffer_path.trim().is_empty() {
            anyhow::bail!("storage.buffer_path cannot be empty");
        }
        if config.storage.output_dir.trim().is_empty() {
            anyhow::bail!("storage.output_dir cannot be empty");
        }
        Ok(config)
    }

    pub fn objects_url(&self) -> String {
        format!("https://{}:{}/objects", self.api.host, self.api.port)
    }

    pub fn buffer_path(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.storage.buffer_path);
        PathBuf::from(expanded.as_ref())
    }

    pub fn output_dir(&self) -> PathBuf {
        let expanded = shellexpand::tilde(&self.storage.output_dir);
        PathBuf::from(expanded.as_ref())
    }

    pub fn threading_number(&self) -> usize {
        self.worker.threading_number.max(1)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.worker.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
        [api]
        host = "localhost"
        port = 7243

        [worker]
        threading_number = 4
        file_gb_size_threshold = 1
        threshold_for_objects = 1000

        [storage]
        buffer_path = "/tmp/obj-worker/buffer.txt"
        output_dir = "/tmp/obj-worker/sorted"
    "#;

    #[test]
    fn parses_valid_config_and_applies_defaults() {
        let config = Config::parse(VALID).unwrap();
        assert_eq!(config.api.host, "localhost");
        assert_eq!(config.api.port, 7243);
        assert_eq!(config.worker.threading_number, 4);
        assert_eq!(config.worker.poll_interval_ms, 1_000);
        assert_eq!(config.poll_interval(), Duration::from_millis(1_000));
        assert_eq!(config.objects_url(), "https://localhost:7243/objects");
    }

    #[test]
    fn rejects_undersized_object_threshold() {
        let raw = VALID.replace("threshold_for_objects = 1000", "threshold_for_objects = 1");
        assert!(Config::parse(&raw).is_err());
    }

    #[test]
    fn rejects_zero_gigabyte_threshold() {
        let raw = VALID.replace("file_gb_size_threshold = 1", "file_gb_size_threshold = 0");
        assert!(Config::parse(&raw).is_err());
    }

    #[test]
    fn rejects_empty_host() {
        let raw = VALID.replace("host = \"localhost\"", "host = \"  \"");
        assert!(Config::parse(&raw).is_err());
    }

    #[test]
    fn threading_number_is_clamped_to_one() {
        let raw = VALID.replace("threading_number = 4", "threading_number = 0");
        let config = Config::parse(&raw).unwrap();
        assert_eq!(config.threading_number(), 1);
    }
}
