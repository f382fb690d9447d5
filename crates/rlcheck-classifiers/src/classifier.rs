//! Classifier trait and common types

use async_trait::async_trait;

/// Trait for all reputation classifiers
#[async_trait]
pub trait ThreatClassifier: Send + Sync {
    /// Classify the given indicator (IP address, domain or URL)
    async fn classify(&self, indicator: &str) -> Result<ClassificationResult, ClassifyError>;

    /// Get the classifier name
    fn name(&self) -> &str;
}

/// Result of a successful classification
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Whether the existing policy already blocks the indicator
    pub blocked: bool,

    /// Threat risk level, 0 if unknown
    pub risk_level: u32,

    /// Category names in the order the service reported them
    pub categories: Vec<String>,

    /// Blocked because one of the categories is blocked
    pub blocked_by_category: bool,

    /// Blocked because the risk level reached the threshold
    pub blocked_by_risk_level: bool,

    /// Latency in microseconds
    pub latency_us: u64,
}

impl ClassificationResult {
    /// Create an unblocked result with the given risk level
    pub fn new(risk_level: u32) -> Self {
        Self {
            risk_level,
            ..Default::default()
        }
    }

    /// Set categories
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Category names joined with `", "`
    pub fn category_list(&self) -> String {
        self.categories.join(", ")
    }
}

/// Classification failures
///
/// None of these are retried; a failed indicator is written to the error output.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    /// Malformed classification request
    #[error("bad request")]
    BadRequest,

    /// Missing or invalid credentials
    #[error("unauthorized")]
    Unauthorized,

    /// API quota exceeded
    #[error("rate limited")]
    RateLimited,

    /// Network, transport or protocol failure before a usable response
    #[error("transport error: {0}")]
    Transport(String),

    /// Threat type the classifier does not handle; never sent upstream
    #[error("unsupported threat type: {0:?}")]
    UnsupportedThreatType(String),
}

impl ClassifyError {
    /// Create a new transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// HTTP status code associated with the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::BadRequest => Some(400),
            Self::Unauthorized => Some(401),
            Self::RateLimited => Some(429),
            Self::Transport(_) | Self::UnsupportedThreatType(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_list() {
        let result = ClassificationResult::new(2).with_categories(["Technology/Internet", "Search Engines/Portals"]);
        assert_eq!(result.category_list(), "Technology/Internet, Search Engines/Portals");
        assert_eq!(ClassificationResult::new(0).category_list(), "");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ClassifyError::BadRequest.status_code(), Some(400));
        assert_eq!(ClassifyError::Unauthorized.status_code(), Some(401));
        assert_eq!(ClassifyError::RateLimited.status_code(), Some(429));
        assert_eq!(ClassifyError::transport("reset").status_code(), None);
    }
}
