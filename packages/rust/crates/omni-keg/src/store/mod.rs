//! Node storage backends.
//!
//! [`NodeStore`] is the minimal surface every backend provides. File and
//! image attachments are optional capabilities probed with
//! [`NodeStore::files`] / [`NodeStore::images`].

mod fs;
mod memory;
mod persistence;

use std::path::PathBuf;

use crate::error::{KegError, KegResult};
use crate::model::{NodeMeta, NodeStats};
use crate::node_id::NodeId;

pub use self::fs::FsStore;
pub use self::memory::MemoryStore;

/// Dex artifact holding the node listing.
pub const INDEX_NODES: &str = "nodes.tsv";
/// Dex artifact holding the tag index.
pub const INDEX_TAGS: &str = "tags";
/// Dex artifact holding forward links.
pub const INDEX_LINKS: &str = "links";
/// Dex artifact holding backlinks.
pub const INDEX_BACKLINKS: &str = "backlinks";
/// Dex artifact holding the human-readable change log.
pub const INDEX_CHANGES: &str = "changes.md";

/// Minimal persistence surface required by the engine.
pub trait NodeStore: Send + Sync {
    /// Stable identity of this store (cache key).
    fn name(&self) -> &str;

    /// Whether a node exists.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn has_node(&self, id: &NodeId) -> KegResult<bool>;

    /// All node ids, ascending.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn list_nodes(&self) -> KegResult<Vec<NodeId>>;

    /// Raw body bytes.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] when the node or its body is missing.
    fn read_content(&self, id: &NodeId) -> KegResult<Vec<u8>>;

    /// Replace the body, creating the node if needed.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn write_content(&self, id: &NodeId, data: &[u8]) -> KegResult<()>;

    /// Raw metadata bytes.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] when the metadata file is missing.
    fn read_meta(&self, id: &NodeId) -> KegResult<Vec<u8>>;

    /// Replace metadata. Implementations validate before writing.
    ///
    /// # Errors
    ///
    /// [`KegError::ParseFailure`] for invalid metadata; nothing is written.
    fn write_meta(&self, id: &NodeId, data: &[u8]) -> KegResult<()>;

    /// Decoded stats.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] when missing, [`KegError::ParseFailure`] when malformed.
    fn read_stats(&self, id: &NodeId) -> KegResult<NodeStats>;

    /// Replace stats.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn write_stats(&self, id: &NodeId, stats: &NodeStats) -> KegResult<()>;

    /// Delete a node's storage.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] when absent.
    fn remove(&self, id: &NodeId) -> KegResult<()>;

    /// Relocate a node's storage without touching other nodes.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for a missing source, [`KegError::DestinationExists`]
    /// for an occupied destination.
    fn move_node(&self, src: &NodeId, dst: &NodeId) -> KegResult<()>;

    /// Read a named dex artifact.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] when the artifact was never written.
    fn read_index(&self, name: &str) -> KegResult<Vec<u8>>;

    /// Replace a named dex artifact.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn write_index(&self, name: &str, data: &[u8]) -> KegResult<()>;

    /// Raw keg config.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] when the keg has no config.
    fn read_config(&self) -> KegResult<Vec<u8>>;

    /// Replace the keg config.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn write_config(&self, data: &[u8]) -> KegResult<()>;

    /// File attachment capability, when supported.
    fn files(&self) -> Option<&dyn FileAttachments> {
        None
    }

    /// Image attachment capability, when supported.
    fn images(&self) -> Option<&dyn ImageAttachments> {
        None
    }
}

/// Optional capability: arbitrary file attachments per node.
pub trait FileAttachments {
    /// Attachment names, sorted.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for a missing node.
    fn list_files(&self, id: &NodeId) -> KegResult<Vec<String>>;
    /// Read one attachment.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for a missing file.
    fn read_file(&self, id: &NodeId, name: &str) -> KegResult<Vec<u8>>;
    /// Write one attachment.
    ///
    /// # Errors
    ///
    /// [`KegError::Invalid`] for unsafe names, [`KegError::NotExist`] for a missing node.
    fn write_file(&self, id: &NodeId, name: &str, data: &[u8]) -> KegResult<()>;
    /// Delete one attachment.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for a missing file.
    fn delete_file(&self, id: &NodeId, name: &str) -> KegResult<()>;
}

/// Optional capability: image attachments per node.
pub trait ImageAttachments {
    /// Image names, sorted.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for a missing node.
    fn list_images(&self, id: &NodeId) -> KegResult<Vec<String>>;
    /// Read one image.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for a missing image.
    fn read_image(&self, id: &NodeId, name: &str) -> KegResult<Vec<u8>>;
    /// Write one image.
    ///
    /// # Errors
    ///
    /// [`KegError::Invalid`] for unsafe names, [`KegError::NotExist`] for a missing node.
    fn write_image(&self, id: &NodeId, name: &str, data: &[u8]) -> KegResult<()>;
    /// Delete one image.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for a missing image.
    fn delete_image(&self, id: &NodeId, name: &str) -> KegResult<()>;
}

/// File attachment capability or a descriptive [`KegError::Unsupported`].
///
/// # Errors
///
/// [`KegError::Unsupported`] when the backend lacks file attachments.
pub fn require_files(store: &dyn NodeStore) -> KegResult<&dyn FileAttachments> {
    store
        .files()
        .ok_or(KegError::Unsupported("file attachments"))
}

/// Image attachment capability or a descriptive [`KegError::Unsupported`].
///
/// # Errors
///
/// [`KegError::Unsupported`] when the backend lacks image attachments.
pub fn require_images(store: &dyn NodeStore) -> KegResult<&dyn ImageAttachments> {
    store
        .images()
        .ok_or(KegError::Unsupported("image attachments"))
}

/// Reject metadata that would not parse back.
pub(crate) fn validate_meta(id: &NodeId, data: &[u8]) -> KegResult<()> {
    let subject = format!("meta.yaml for node {id}");
    let text = std::str::from_utf8(data).map_err(|e| KegError::parse(&subject, e))?;
    NodeMeta::parse(text, &subject).map(|_| ())
}

/// Reject attachment names that could escape the node directory.
pub(crate) fn validate_attachment_name(name: &str) -> KegResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty()
        || trimmed.starts_with('.')
        || trimmed.contains(['/', '\\'])
        || trimmed != name
    {
        return Err(KegError::invalid(
            "attachment name",
            format!("'{name}' must be a plain file name"),
        ));
    }
    Ok(())
}

/// Where a keg lives. Chosen once when the keg is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KegTarget {
    /// Directory on the local filesystem.
    Local(PathBuf),
    /// Process-local, non-persistent keg.
    Memory,
}

impl KegTarget {
    /// Parse `memory:`, `file:<dir>`, or a bare directory path.
    ///
    /// # Errors
    ///
    /// [`KegError::Invalid`] for an empty target.
    pub fn parse(raw: &str) -> KegResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(KegError::invalid("keg target", "empty target"));
        }
        if trimmed.eq_ignore_ascii_case("memory:") || trimmed.eq_ignore_ascii_case("mem:") {
            return Ok(Self::Memory);
        }
        let path = trimmed.strip_prefix("file:").unwrap_or(trimmed);
        if path.is_empty() {
            return Err(KegError::invalid("keg target", "empty path"));
        }
        Ok(Self::Local(PathBuf::from(path)))
    }

    /// Instantiate the backend for this target.
    #[must_use]
    pub fn open(&self) -> Box<dyn NodeStore> {
        match self {
            Self::Local(root) => Box::new(FsStore::new(root)),
            Self::Memory => Box::new(MemoryStore::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_target_parse() -> KegResult<()> {
        assert_eq!(KegTarget::parse("memory:")?, KegTarget::Memory);
        assert_eq!(
            KegTarget::parse("file:/tmp/keg")?,
            KegTarget::Local(PathBuf::from("/tmp/keg"))
        );
        assert_eq!(
            KegTarget::parse("./notes")?,
            KegTarget::Local(PathBuf::from("./notes"))
        );
        assert_eq!(
            KegTarget::parse("  ").err().map(|e| e.kind()),
            Some(ErrorKind::Invalid)
        );
        Ok(())
    }

    #[test]
    fn test_attachment_names() {
        assert!(validate_attachment_name("diagram.png").is_ok());
        for bad in ["", "../x", "a/b", ".hidden", " pad"] {
            assert!(validate_attachment_name(bad).is_err(), "{bad}");
        }
    }
}
