//! Graph configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// Tunables for a [`Graph`](crate::graph::Graph).
///
/// Every field has a default, so a partial JSON document is valid:
///
/// ```json
/// { "slow_pass_ms": 16 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Log a summary of non-silent passes at `info` level.
    pub log_passes: bool,

    /// Passes slower than this many milliseconds log a warning, silent or not.
    pub slow_pass_ms: Option<u64>,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            log_passes: true,
            slow_pass_ms: None,
        }
    }
}

impl GraphConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The slow-pass threshold as a duration.
    pub fn slow_pass_threshold(&self) -> Option<Duration> {
        self.slow_pass_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = GraphConfig::from_json("{}").unwrap();
        assert_eq!(config, GraphConfig::default());
        assert!(config.log_passes);
        assert!(config.slow_pass_threshold().is_none());
    }

    #[test]
    fn partial_document_overrides_fields() {
        let config = GraphConfig::from_json(r#"{ "slow_pass_ms": 16 }"#).unwrap();
        assert!(config.log_passes);
        assert_eq!(config.slow_pass_threshold(), Some(Duration::from_millis(16)));
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        let err = GraphConfig::from_json(r#"{ "log_passes": "yes" }"#).unwrap_err();
        assert!(matches!(err, GraphError::Config(_)));
    }
}
