use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use super::EditorConfig;
use super::session::{EditSummary, run_edit_session};
use crate::error::{ErrorKind, KegError, KegResult};
use crate::keg::Keg;
use crate::model::NodeMeta;
use crate::node_id::NodeId;
use crate::parser::{compose_document, split_frontmatter};

/// What applying one edit buffer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Buffer matched the stored node; nothing written.
    Unchanged,
    /// Metadata and/or body persisted and stats refreshed.
    Saved,
}

impl Keg {
    /// Node rendered as an editable document: YAML frontmatter + body.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for unknown nodes; [`KegError::ParseFailure`]
    /// when stored files are not UTF-8.
    pub fn edit_buffer(&self, id: &NodeId) -> KegResult<String> {
        self.require_node(id)?;
        let yaml = match self.store().read_meta(id) {
            Ok(raw) => String::from_utf8(raw)
                .map_err(|e| KegError::parse(format!("meta.yaml for node {id}"), e))?,
            Err(err) if err.kind() == ErrorKind::NotExist => String::new(),
            Err(err) => return Err(err),
        };
        let body = String::from_utf8(self.body_or_empty(id)?)
            .map_err(|e| KegError::parse(format!("README.md for node {id}"), e))?;
        Ok(compose_document(&yaml, &body))
    }

    /// Validate an edited buffer and persist whatever changed.
    ///
    /// A buffer without frontmatter replaces only the body. Nothing is written
    /// unless the frontmatter and body both validate.
    ///
    /// # Errors
    ///
    /// [`KegError::ParseFailure`] for bad frontmatter or non-UTF-8 input.
    pub fn apply_edit(&self, id: &NodeId, edited: &[u8]) -> KegResult<EditOutcome> {
        if self.edit_buffer(id)?.as_bytes() == edited {
            return Ok(EditOutcome::Unchanged);
        }
        let text = std::str::from_utf8(edited)
            .map_err(|e| KegError::parse(format!("edit buffer for node {id}"), e))?;
        let (yaml, body) = split_frontmatter(text)?;
        let current_meta = self.read_meta(id)?;
        let meta = match yaml {
            Some(yaml) => NodeMeta::parse(yaml, &format!("frontmatter for node {id}"))?,
            None => current_meta.clone(),
        };

        let meta_changed = meta != current_meta;
        let body_changed = self.body_or_empty(id)? != body.as_bytes();
        if !meta_changed && !body_changed {
            return Ok(EditOutcome::Unchanged);
        }
        if meta_changed {
            self.store().write_meta(id, meta.to_yaml()?.as_bytes())?;
        }
        if body_changed {
            self.store().write_content(id, body.as_bytes())?;
        }
        self.refresh_stats(id, body.as_bytes(), &meta, true)?;
        debug!(node = %id, meta_changed, body_changed, "applied edit");
        Ok(EditOutcome::Saved)
    }
}

/// Edit a node in an external editor through a temporary buffer file.
///
/// The dex is not updated; run [`Keg::index`] afterwards.
///
/// # Errors
///
/// See [`run_edit_session`]; the buffer file is removed either way.
pub async fn edit_node(
    keg: &Keg,
    id: &NodeId,
    config: &EditorConfig,
    cancel: &CancellationToken,
) -> KegResult<EditSummary> {
    let buffer = keg.edit_buffer(id)?;
    let path = std::env::temp_dir().join(format!("keg-{id}-{}.md", Uuid::new_v4().simple()));
    std::fs::write(&path, buffer.as_bytes()).map_err(|e| KegError::io(&path, e))?;

    let result = run_edit_session(&path, config, cancel, |bytes| keg.apply_edit(id, bytes)).await;

    if let Err(err) = std::fs::remove_file(&path) {
        debug!(path = %path.display(), error = %err, "buffer cleanup failed");
    }
    result
}
