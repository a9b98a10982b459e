//! `stats.json`: engine-derived node state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{KegError, KegResult};
use crate::node_id::NodeId;

/// Derived statistics regenerated by the engine on every content write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Effective title (metadata override, else first heading).
    #[serde(default)]
    pub title: String,
    /// Digest of the body the stats were derived from.
    #[serde(default)]
    pub hash: String,
    /// Creation time.
    pub created: DateTime<Utc>,
    /// Last content change.
    pub updated: DateTime<Utc>,
    /// Effective lead (metadata override, else first paragraph).
    #[serde(default)]
    pub lead: String,
    /// Outbound node references that resolved when last indexed.
    #[serde(default)]
    pub links: Vec<NodeId>,
}

impl NodeStats {
    /// Fresh stats stamped with `now` for both timestamps.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            title: String::new(),
            hash: String::new(),
            created: now,
            updated: now,
            lead: String::new(),
            links: Vec::new(),
        }
    }

    /// Decode from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`KegError::ParseFailure`] on malformed JSON.
    pub fn parse(raw: &[u8], subject: &str) -> KegResult<Self> {
        serde_json::from_slice(raw).map_err(|e| KegError::parse(subject, e))
    }

    /// Encode as pretty JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns [`KegError::ParseFailure`] if serialization fails.
    pub fn to_json(&self) -> KegResult<String> {
        let mut out = serde_json::to_string_pretty(self).map_err(|e| KegError::parse("stats", e))?;
        out.push('\n');
        Ok(out)
    }
}

/// Listing row kept in the dex for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    /// Node id.
    pub id: NodeId,
    /// Display title.
    pub title: String,
    /// Last content change.
    pub updated: DateTime<Utc>,
}
