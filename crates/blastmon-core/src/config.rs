//! Collector configuration.

use std::fmt;
use std::time::Duration;

use crate::counter::{SchemaError, is_valid_name};
use crate::families::{self, BLAST_FAMILIES, FamilyDef};

/// Default metric namespace.
pub const DEFAULT_NAMESPACE: &str = "windows";
/// Default collector name, the second metric name part.
pub const DEFAULT_COLLECTOR_NAME: &str = "vmware_blast";
/// Default threshold above which a family poll is reported as slow.
pub const DEFAULT_SLOW_FAMILY_THRESHOLD: Duration = Duration::from_secs(5);

/// Error type for invalid configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Family name is not one of the known counter families.
    UnknownFamily(String),
    /// Namespace or collector name is not a valid metric name part.
    InvalidName { what: &'static str, value: String },
    /// A family table failed validation.
    Schema(SchemaError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownFamily(name) => write!(f, "unknown family \"{}\"", name),
            ConfigError::InvalidName { what, value } => {
                write!(f, "invalid {} \"{}\"", what, value)
            }
            ConfigError::Schema(e) => write!(f, "schema error: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaError> for ConfigError {
    fn from(e: SchemaError) -> Self {
        ConfigError::Schema(e)
    }
}

/// Configuration of the Blast collector.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    pub namespace: String,
    pub collector_name: String,
    /// Families to collect. Empty means all.
    pub families: Vec<String>,
    /// Families to leave out, applied after `families`.
    pub exclude_families: Vec<String>,
    /// Poll families on the rayon pool instead of one after another.
    pub parallel: bool,
    pub slow_family_threshold: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            collector_name: DEFAULT_COLLECTOR_NAME.to_string(),
            families: Vec::new(),
            exclude_families: Vec::new(),
            parallel: false,
            slow_family_threshold: DEFAULT_SLOW_FAMILY_THRESHOLD,
        }
    }
}

impl CollectorConfig {
    /// Checks names and family lists.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (what, value) in [
            ("namespace", &self.namespace),
            ("collector name", &self.collector_name),
        ] {
            if !value.is_empty() && !is_valid_name(value) {
                return Err(ConfigError::InvalidName {
                    what,
                    value: value.clone(),
                });
            }
        }

        if let Some(unknown) = self
            .families
            .iter()
            .chain(&self.exclude_families)
            .find(|name| families::find(name).is_none())
        {
            return Err(ConfigError::UnknownFamily(unknown.clone()));
        }

        Ok(())
    }

    /// Families to collect, in registration order.
    pub fn selected_families(&self) -> Result<Vec<&'static FamilyDef>, ConfigError> {
        self.validate()?;

        Ok(BLAST_FAMILIES
            .iter()
            .filter(|f| self.families.is_empty() || self.families.iter().any(|n| n == f.name))
            .filter(|f| !self.exclude_families.iter().any(|n| n == f.name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CollectorConfig::default();
        assert_eq!(config.namespace, "windows");
        assert_eq!(config.collector_name, "vmware_blast");
        assert!(!config.parallel);
        assert_eq!(config.slow_family_threshold, Duration::from_secs(5));
        assert_eq!(config.selected_families().unwrap().len(), BLAST_FAMILIES.len());
    }

    #[test]
    fn test_include_and_exclude() {
        let config = CollectorConfig {
            families: vec!["usb".into(), "session".into(), "audio".into()],
            exclude_families: vec!["usb".into()],
            ..CollectorConfig::default()
        };

        let names: Vec<_> = config
            .selected_families()
            .unwrap()
            .iter()
            .map(|f| f.name)
            .collect();
        // Registration order, not the order given.
        assert_eq!(names, vec!["audio", "session"]);
    }

    #[test]
    fn test_unknown_family() {
        let config = CollectorConfig {
            exclude_families: vec!["bluetooth".into()],
            ..CollectorConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::UnknownFamily("bluetooth".into()))
        );
    }

    #[test]
    fn test_invalid_namespace() {
        let config = CollectorConfig {
            namespace: "Windows-Host".into(),
            ..CollectorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidName { what: "namespace", .. }));
    }

    #[test]
    fn test_empty_namespace_allowed() {
        let config = CollectorConfig {
            namespace: String::new(),
            ..CollectorConfig::default()
        };
        assert!(config.validate().is_ok());
    }
}
