use crate::error::{ConfigurationError, Result};
use irma_revocation::DEFAULT_MAX_EVENTS;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Options of a [`Configuration`](crate::Configuration).
///
/// All fields are optional in TOML:
///
/// ```toml
/// assets = "/usr/share/irma/irma_configuration"
/// read_only = false
/// remote_timeout_secs = 30
/// revocation_max_events = 256
/// ```
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigurationOptions {
    /// Baseline scheme folder shipped with the application. Used to populate
    /// a fresh storage directory and as the last recovery source.
    pub assets: Option<PathBuf>,

    /// Never write to the storage directory. Disables autocopy and recovery.
    pub read_only: bool,

    /// Upper bound on one remote reinstall of a scheme manager.
    pub remote_timeout_secs: u64,

    /// Number of revocation events kept per accumulator chain.
    pub revocation_max_events: usize,
}

impl Default for ConfigurationOptions {
    fn default() -> Self {
        Self {
            assets: None,
            read_only: false,
            remote_timeout_secs: 30,
            revocation_max_events: DEFAULT_MAX_EVENTS,
        }
    }
}

impl ConfigurationOptions {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = crate::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_fields() {
        let opts = ConfigurationOptions::from_toml_str("read_only = true\n").unwrap();
        assert!(opts.read_only);
        assert_eq!(opts.assets, None);
        assert_eq!(opts.remote_timeout(), Duration::from_secs(30));
        assert_eq!(opts.revocation_max_events, DEFAULT_MAX_EVENTS);
        assert_eq!(ConfigurationOptions::from_toml_str("").unwrap(), ConfigurationOptions::default());
    }

    #[test]
    fn parses_all_fields() {
        let opts = ConfigurationOptions::from_toml_str(
            r#"
            assets = "/opt/irma/assets"
            remote_timeout_secs = 5
            revocation_max_events = 16
            "#,
        )
        .unwrap();
        assert_eq!(opts.assets, Some(PathBuf::from("/opt/irma/assets")));
        assert_eq!(opts.remote_timeout_secs, 5);
        assert_eq!(opts.revocation_max_events, 16);
    }

    #[test]
    fn rejects_wrong_types() {
        assert!(matches!(
            ConfigurationOptions::from_toml_str("read_only = \"yes\""),
            Err(ConfigurationError::Options(_))
        ));
    }
}
