//! Block policy: decides whether a classification is already covered
//!
//! An indicator counts as blocked when any of its categories is in the blocked
//! set, or when its risk level reaches the minimum blocked level (inclusive).

use crate::classifier::ClassificationResult;
use serde::{Deserialize, Serialize};

/// Category reported by the reputation service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
}

impl Category {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Policy thresholds mirrored from the WSS/ProxySG configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPolicy {
    /// Category ids blocked by the policy
    /// (Hacking, Phishing, Malicious Sources/Malnets, Malicious Outbound Data/Botnets)
    #[serde(default = "default_blocked_categories")]
    pub blocked_category_ids: Vec<u32>,

    /// Minimum risk level blocked by the policy
    #[serde(default = "default_min_risk_level")]
    pub min_blocked_risk_level: u32,
}

impl Default for BlockPolicy {
    fn default() -> Self {
        Self {
            blocked_category_ids: default_blocked_categories(),
            min_blocked_risk_level: default_min_risk_level(),
        }
    }
}

fn default_blocked_categories() -> Vec<u32> {
    vec![17, 18, 43, 44]
}

fn default_min_risk_level() -> u32 {
    8
}

impl BlockPolicy {
    /// Whether a category id is blocked
    pub fn blocks_category(&self, id: u32) -> bool {
        self.blocked_category_ids.contains(&id)
    }

    /// Whether a risk level is blocked
    pub fn blocks_risk_level(&self, level: u32) -> bool {
        level >= self.min_blocked_risk_level
    }

    /// Build the classification for the given categories and risk level
    pub fn evaluate(&self, categories: &[Category], risk_level: Option<u32>) -> ClassificationResult {
        let blocked_by_category = categories.iter().any(|c| self.blocks_category(c.id));
        let blocked_by_risk_level = risk_level.is_some_and(|level| self.blocks_risk_level(level));

        ClassificationResult {
            blocked: blocked_by_category || blocked_by_risk_level,
            risk_level: risk_level.unwrap_or(0),
            categories: categories.iter().map(|c| c.name.clone()).collect(),
            blocked_by_category,
            blocked_by_risk_level,
            latency_us: 0,
        }
    }
}
