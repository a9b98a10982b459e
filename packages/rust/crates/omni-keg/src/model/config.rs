//! `<keg>/keg`: per-keg configuration file.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::error::{KegError, KegResult};

/// Current keg format version written by [`KegConfig::default`].
pub const KEG_CONFIG_VERSION: &str = "2023-01";

fn default_version() -> String {
    KEG_CONFIG_VERSION.to_string()
}

/// Keg-level configuration. Unknown keys survive a read/write cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KegConfig {
    /// Format version.
    #[serde(default = "default_version")]
    pub kegv: String,
    /// Human readable keg title.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    /// Canonical published location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Owner / creator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// Lifecycle state label (`living`, `archived`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// One-line description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Last successful index run; the incremental checkpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    /// Keys this crate does not interpret.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Default for KegConfig {
    fn default() -> Self {
        Self {
            kegv: default_version(),
            title: String::new(),
            url: None,
            creator: None,
            state: None,
            summary: None,
            updated: None,
            extra: BTreeMap::new(),
        }
    }
}

impl KegConfig {
    /// Config with a title and defaults elsewhere.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Parse YAML config text.
    ///
    /// # Errors
    ///
    /// Returns [`KegError::ParseFailure`] on malformed YAML and
    /// [`KegError::Invalid`] on an empty version string.
    pub fn parse(raw: &str) -> KegResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(raw).map_err(|e| KegError::parse("keg config", e))?;
        if config.kegv.trim().is_empty() {
            return Err(KegError::invalid("keg config", "kegv must not be empty"));
        }
        Ok(config)
    }

    /// Render as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`KegError::ParseFailure`] if serialization fails.
    pub fn to_yaml(&self) -> KegResult<String> {
        serde_yaml::to_string(self).map_err(|e| KegError::parse("keg config", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_keys_survive() -> Result<(), KegError> {
        let config = KegConfig::parse("kegv: 2023-01\ntitle: Mine\nlinks:\n  - a\n")?;
        assert_eq!(config.title, "Mine");
        assert!(config.extra.contains_key("links"));
        let again = KegConfig::parse(&config.to_yaml()?)?;
        assert_eq!(again, config);
        Ok(())
    }
}
