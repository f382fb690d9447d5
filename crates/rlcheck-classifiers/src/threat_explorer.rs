//! ThreatExplorer reputation API client
//!
//! Looks up an indicator with a single GET request:
//!
//! ```text
//! GET <base_url>?level=STANDARD&url=<indicator>
//! Authorization: <api key>
//! ```
//!
//! A 200 response carries optional `categorization.categories` and
//! `threatRiskLevel.level` sections, which are run through the [`BlockPolicy`].
//! 400, 401 and 429 map onto their own error kinds; everything else that keeps
//! us from a usable answer is a transport error.

use crate::classifier::{ClassificationResult, ClassifyError, ThreatClassifier};
use crate::policy::{BlockPolicy, Category};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

/// Connection settings for the ThreatExplorer API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatExplorerConfig {
    /// Lookup endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Lookup depth requested from the API
    #[serde(default = "default_level")]
    pub level: String,

    /// API key sent verbatim in the `Authorization` header
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ThreatExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            level: default_level(),
            api_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    "https://threatexplorer.symantec.com/api/v1/url".to_string()
}

fn default_level() -> String {
    "STANDARD".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Lookup response body; every section is optional
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResponse {
    #[serde(default)]
    categorization: Option<Categorization>,
    #[serde(default)]
    threat_risk_level: Option<ThreatRiskLevel>,
}

#[derive(Debug, Default, Deserialize)]
struct Categorization {
    #[serde(default)]
    categories: Vec<Category>,
}

#[derive(Debug, Default, Deserialize)]
struct ThreatRiskLevel {
    #[serde(default)]
    level: Option<u32>,
}

impl LookupResponse {
    fn into_classification(self, policy: &BlockPolicy) -> ClassificationResult {
        let categories = self
            .categorization
            .map(|c| c.categories)
            .unwrap_or_default();
        let risk_level = self.threat_risk_level.and_then(|r| r.level);
        policy.evaluate(&categories, risk_level)
    }
}

/// Map a non-success status onto the error taxonomy
fn status_error(status: StatusCode) -> ClassifyError {
    match status {
        StatusCode::BAD_REQUEST => ClassifyError::BadRequest,
        StatusCode::UNAUTHORIZED => ClassifyError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => ClassifyError::RateLimited,
        other => ClassifyError::transport(format!("unexpected status {}", other)),
    }
}

/// HTTP classifier backed by the ThreatExplorer API
pub struct ThreatExplorerClient {
    http: reqwest::Client,
    config: ThreatExplorerConfig,
    policy: BlockPolicy,
}

impl ThreatExplorerClient {
    /// Create a new client
    pub fn new(config: ThreatExplorerConfig, policy: BlockPolicy) -> Result<Self, ClassifyError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClassifyError::transport(e.to_string()))?;

        Ok(Self {
            http,
            config,
            policy,
        })
    }

    /// The policy used to decide whether a result is blocked
    pub fn policy(&self) -> &BlockPolicy {
        &self.policy
    }

    fn decode(&self, body: &[u8]) -> Result<ClassificationResult, ClassifyError> {
        let response: LookupResponse = serde_json::from_slice(body)
            .map_err(|e| ClassifyError::transport(format!("invalid response body: {}", e)))?;
        Ok(response.into_classification(&self.policy))
    }
}

#[async_trait]
impl ThreatClassifier for ThreatExplorerClient {
    async fn classify(&self, indicator: &str) -> Result<ClassificationResult, ClassifyError> {
        let start = Instant::now();

        let response = self
            .http
            .get(&self.config.base_url)
            .query(&[("level", self.config.level.as_str()), ("url", indicator)])
            .header(AUTHORIZATION, &self.config.api_key)
            .send()
            .await
            .map_err(|e| ClassifyError::transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            debug!(indicator, %status, "lookup rejected");
            return Err(status_error(status));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ClassifyError::transport(e.to_string()))?;

        let mut result = self.decode(&body)?;
        result.latency_us = start.elapsed().as_micros() as u64;
        Ok(result)
    }

    fn name(&self) -> &str {
        "threat-explorer"
    }
}
