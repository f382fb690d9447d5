//! Pipeline configuration

use rlcheck_core::{Error, Result};
use rlcheck_telemetry::SinkOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of classification worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Seconds between progress lines
    #[serde(default = "default_progress_interval_secs")]
    pub progress_interval_secs: u64,

    /// How long a worker waits on an empty queue before re-checking shutdown
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Runtime threads driving classifier I/O
    #[serde(default = "default_io_threads")]
    pub io_threads: usize,

    /// Threat types sent to the classifier; anything else goes to the error output
    #[serde(default = "default_supported_threat_types")]
    pub supported_threat_types: Vec<String>,

    /// Input field delimiter, must be ASCII
    #[serde(default = "default_input_delimiter")]
    pub input_delimiter: char,

    /// Output file format
    #[serde(default)]
    pub sink: SinkOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            progress_interval_secs: default_progress_interval_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            io_threads: default_io_threads(),
            supported_threat_types: default_supported_threat_types(),
            input_delimiter: default_input_delimiter(),
            sink: SinkOptions::default(),
        }
    }
}

fn default_workers() -> usize {
    10
}

fn default_progress_interval_secs() -> u64 {
    5
}

fn default_poll_interval_ms() -> u64 {
    50
}

fn default_io_threads() -> usize {
    2
}

fn default_supported_threat_types() -> Vec<String> {
    vec!["IP Address".to_string(), "Domain".to_string(), "URL".to_string()]
}

fn default_input_delimiter() -> char {
    ','
}

impl PipelineConfig {
    /// Set the worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the progress interval in seconds
    pub fn with_progress_interval_secs(mut self, secs: u64) -> Self {
        self.progress_interval_secs = secs;
        self
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Whether a threat type is sent to the classifier
    pub fn supports(&self, threat_type: &str) -> bool {
        self.supported_threat_types.iter().any(|t| t == threat_type)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::config("at least one worker is required"));
        }
        if self.io_threads == 0 {
            return Err(Error::config("at least one I/O thread is required"));
        }
        if self.progress_interval_secs == 0 {
            return Err(Error::config("progress interval must be at least one second"));
        }
        if self.poll_interval_ms == 0 {
            return Err(Error::config("poll interval must be positive"));
        }
        if self.supported_threat_types.is_empty() {
            return Err(Error::config("no supported threat types configured"));
        }
        if !self.input_delimiter.is_ascii() {
            return Err(Error::config(format!(
                "input delimiter {:?} is not ASCII",
                self.input_delimiter
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.workers, 10);
        assert_eq!(config.progress_interval(), Duration::from_secs(5));
        assert!(config.supports("IP Address"));
        assert!(config.supports("URL"));
        assert!(!config.supports("FileHash-SHA256"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let config = PipelineConfig::default().with_workers(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_empty_threat_types() {
        let config = PipelineConfig {
            supported_threat_types: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
