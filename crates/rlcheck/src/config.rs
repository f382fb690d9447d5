//! Run configuration
//!
//! Defaults, then the optional YAML file, then command-line flags.

use anyhow::{bail, Context};
use rlcheck_classifiers::{BlockPolicy, ThreatExplorerConfig};
use rlcheck_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Everything a run needs besides the input and output paths
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// Reputation API connection
    #[serde(default)]
    pub threat_explorer: ThreatExplorerConfig,

    /// What the existing proxy policy already blocks
    #[serde(default)]
    pub policy: BlockPolicy,

    /// Worker pool and file format settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl RunConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(cli: &crate::Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(threads) = cli.threads {
            config.pipeline.workers = threads;
        }
        if let Some(interval) = cli.interval {
            config.pipeline.progress_interval_secs = interval;
        }
        if let Some(api_key) = &cli.api_key {
            config.threat_explorer.api_key = api_key.clone();
        }

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.threat_explorer.api_key.trim().is_empty() {
            bail!("no API key: set TEX_API_KEY (environment or .env) or pass --api-key");
        }
        self.pipeline.validate()?;
        Ok(())
    }
}
