//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{EngineError, Result};

/// Configuration for the [`ReconciliationEngine`](crate::ReconciliationEngine).
///
/// Every field has a default, so a JSON document only needs the fields it
/// changes:
///
/// ```rust
/// use catalog_sync::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{ "fetch_timeout_ms": 2000 }"#).unwrap();
/// assert_eq!(config.max_concurrent_fetches, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of delta fetches in flight at once.
    pub max_concurrent_fetches: usize,

    /// Per-delta fetch timeout. Expiry counts as a delta failure.
    #[serde(rename = "fetch_timeout_ms", deserialize_with = "millis")]
    pub fetch_timeout: Option<Duration>,

    /// Whether to validate payloads before applying them.
    pub validate_payloads: bool,

    /// Whether to publish a `DeltaFailed` snapshot when a delta fails.
    pub publish_delta_failures: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 5,
            fetch_timeout: None,
            validate_payloads: true,
            publish_delta_failures: true,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON and check it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_fetches == 0 {
            return Err(EngineError::InvalidConfig(
                "max_concurrent_fetches must be at least 1".into(),
            ));
        }
        if self.fetch_timeout == Some(Duration::ZERO) {
            return Err(EngineError::InvalidConfig(
                "fetch_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Set the per-delta fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }

    /// Set the fetch concurrency bound.
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }
}

fn millis<'de, D>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_timeout_in_millis() {
        let config = EngineConfig::from_json(
            r#"{ "fetch_timeout_ms": 250, "publish_delta_failures": false }"#,
        )
        .unwrap();
        assert_eq!(config.fetch_timeout, Some(Duration::from_millis(250)));
        assert!(!config.publish_delta_failures);
        assert!(config.validate_payloads);
    }

    #[test]
    fn test_null_timeout() {
        let config = EngineConfig::from_json(r#"{ "fetch_timeout_ms": null }"#).unwrap();
        assert_eq!(config.fetch_timeout, None);
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let err = EngineConfig::from_json(r#"{ "max_concurrent_fetches": 0 }"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = EngineConfig::from_json(r#"{ "retries": 3 }"#).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
