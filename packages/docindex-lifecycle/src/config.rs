//! Lifecycle configuration (YAML)
//!
//! ```yaml
//! prefix: t
//! separator: "-"
//! replay_page_size: 100
//! group_size: 2
//! request_timeout_ms: 30000
//! settings:
//!   number_of_shards: 1
//!   number_of_replicas: 0
//! ```
//!
//! Every field is optional; missing fields take the defaults below.

use docindex_store::{IndexSettings, StoreClient, TimeoutStoreClient};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::descriptor::{IndexDescriptor, DEFAULT_SEPARATOR};
use crate::error::{LifecycleError, Result};

/// Rows fetched per replay page
pub const DEFAULT_REPLAY_PAGE_SIZE: usize = 100;

/// Managers per orchestrator group
pub const DEFAULT_GROUP_SIZE: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LifecycleConfig {
    pub prefix: String,
    pub separator: String,
    pub replay_page_size: usize,
    pub group_size: usize,
    /// Per-call deadline for store requests; no deadline when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_ms: Option<u64>,
    pub settings: IndexSettings,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            separator: DEFAULT_SEPARATOR.to_string(),
            replay_page_size: DEFAULT_REPLAY_PAGE_SIZE,
            group_size: DEFAULT_GROUP_SIZE,
            request_timeout_ms: None,
            settings: IndexSettings::default(),
        }
    }
}

impl LifecycleConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.separator.is_empty() {
            return Err(LifecycleError::config("separator must not be empty"));
        }
        if self.replay_page_size == 0 {
            return Err(LifecycleError::config("replay_page_size must be at least 1"));
        }
        if self.group_size == 0 {
            return Err(LifecycleError::config("group_size must be at least 1"));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(LifecycleError::config(
                "request_timeout_ms must be positive when set",
            ));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Descriptor using this config's prefix and separator
    pub fn descriptor(
        &self,
        language_tag: impl Into<String>,
        base_name: impl Into<String>,
        version: u32,
    ) -> Result<IndexDescriptor> {
        IndexDescriptor::with_separator(
            self.prefix.clone(),
            language_tag,
            base_name,
            version,
            self.separator.clone(),
        )
    }

    /// Apply the configured request timeout, if any
    pub fn wrap_store(&self, store: Arc<dyn StoreClient>) -> Arc<dyn StoreClient> {
        match self.request_timeout() {
            Some(timeout) => Arc::new(TimeoutStoreClient::new(store, timeout)),
            None => store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = LifecycleConfig::default();
        assert_eq!(config.separator, "-");
        assert_eq!(config.replay_page_size, 100);
        assert_eq!(config.group_size, 2);
        assert_eq!(config.request_timeout(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_loading() {
        let yaml = r#"
prefix: t
replay_page_size: 50
request_timeout_ms: 1500
settings:
  number_of_replicas: 0
  refresh_interval: 1s
"#;
        let config = LifecycleConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.prefix, "t");
        assert_eq!(config.separator, "-");
        assert_eq!(config.replay_page_size, 50);
        assert_eq!(config.group_size, 2);
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(config.settings.number_of_replicas, 0);
        assert_eq!(config.settings.extra["refresh_interval"], "1s");
    }

    #[test]
    fn test_yaml_file_loading() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "prefix: prod\ngroup_size: 4").unwrap();

        let config = LifecycleConfig::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.prefix, "prod");
        assert_eq!(config.group_size, 4);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = LifecycleConfig::from_yaml_file("/nonexistent/lifecycle.yaml").unwrap_err();
        assert!(matches!(err, LifecycleError::Io(_)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = LifecycleConfig::from_yaml_str("page_size: 10").unwrap_err();
        assert!(matches!(err, LifecycleError::Yaml(_)));
    }

    #[test]
    fn test_validation() {
        for yaml in [
            "replay_page_size: 0",
            "group_size: 0",
            "separator: ''",
            "request_timeout_ms: 0",
        ] {
            let err = LifecycleConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, LifecycleError::Config(_)), "{}", yaml);
        }
    }

    #[test]
    fn test_yaml_roundtrip() {
        let config = LifecycleConfig {
            prefix: "t".to_string(),
            request_timeout_ms: Some(250),
            ..Default::default()
        };
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("prefix: t"));
        assert_eq!(LifecycleConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_descriptor_uses_prefix_and_separator() {
        let config = LifecycleConfig::from_yaml_str("prefix: t\nseparator: '.'").unwrap();
        let d = config.descriptor("en", "books", 7).unwrap();
        assert_eq!(d.full_name(), "t.en.books.v7");
        assert_eq!(d.alias_name(), "t.en.books");
    }
}
