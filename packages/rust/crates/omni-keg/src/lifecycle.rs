//! Node lifecycle: id allocation, create, content/metadata writes, move, remove.

use std::collections::BTreeMap;
use std::io::Read;

use chrono::Utc;
use serde_yaml::Value;
use tracing::{info, warn};

use crate::error::{ErrorKind, KegError, KegResult};
use crate::keg::Keg;
use crate::model::{NodeMeta, NodeStats};
use crate::node_id::NodeId;
use crate::parser::{parse_content, rewrite_references};
use crate::store::validate_meta;
use crate::stream::Stream;

/// Inputs for [`Keg::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Title; seeds the default body's heading.
    pub title: Option<String>,
    /// Lead; seeds the default body's first paragraph.
    pub lead: Option<String>,
    /// Tags (normalized on write).
    pub tags: Vec<String>,
    /// Extra metadata attributes.
    pub attrs: BTreeMap<String, Value>,
    /// Explicit body. When absent the body is built from title and lead.
    pub body: Option<Vec<u8>>,
}

impl CreateOptions {
    /// Options with just a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// Use piped input as the body, if any.
    ///
    /// # Errors
    ///
    /// I/O failures while draining the stream.
    pub fn seed_from<R: Read>(mut self, stream: &mut Stream<R>) -> KegResult<Self> {
        if let Some(seed) = stream.read_seed()? {
            self.body = Some(seed);
        }
        Ok(self)
    }

    fn default_body(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str("# ");
            out.push_str(title.trim());
            out.push('\n');
        }
        if let Some(lead) = &self.lead {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(lead.trim());
            out.push('\n');
        }
        out
    }

    /// Title and lead live in the body unless the caller supplied one.
    fn to_meta(&self) -> NodeMeta {
        let explicit = self.body.is_some();
        let mut meta = NodeMeta {
            title: self.title.clone().filter(|_| explicit),
            lead: self.lead.clone().filter(|_| explicit),
            attrs: self.attrs.clone(),
            ..NodeMeta::default()
        };
        meta.set_tags(&self.tags);
        meta
    }
}

fn stats_or_none(result: KegResult<NodeStats>) -> KegResult<Option<NodeStats>> {
    match result {
        Ok(stats) => Ok(Some(stats)),
        Err(err) if matches!(err.kind(), ErrorKind::NotExist | ErrorKind::ParseFailure) => Ok(None),
        Err(err) => Err(err),
    }
}

impl Keg {
    /// Id the next [`Keg::create`] would allocate. Nothing is reserved.
    ///
    /// # Errors
    ///
    /// Backend listing failures.
    pub fn peek_next_id(&self) -> KegResult<NodeId> {
        let highest = self.store().list_nodes()?.iter().map(NodeId::number).max();
        Ok(highest.map_or(NodeId::ZERO, |n| NodeId::new(n + 1)))
    }

    /// Allocate the next id and persist body, metadata and stats.
    ///
    /// The dex is not updated; run [`Keg::index`] afterwards.
    ///
    /// # Errors
    ///
    /// Metadata validation failures (before anything is written) and backend failures.
    pub fn create(&self, options: &CreateOptions) -> KegResult<NodeId> {
        let id = self.peek_next_id()?;
        self.create_at(&id, options)?;
        info!(node = %id, "created node");
        Ok(id)
    }

    pub(crate) fn create_at(&self, id: &NodeId, options: &CreateOptions) -> KegResult<()> {
        if self.store().has_node(id)? {
            return Err(KegError::DestinationExists(id.clone()));
        }
        let meta = options.to_meta();
        let yaml = meta.to_yaml()?;
        validate_meta(id, yaml.as_bytes())?;
        let body = options
            .body
            .clone()
            .unwrap_or_else(|| options.default_body().into_bytes());
        self.store().write_content(id, &body)?;
        self.store().write_meta(id, yaml.as_bytes())?;
        self.refresh_stats(id, &body, &meta, true)?;
        Ok(())
    }

    pub(crate) fn require_node(&self, id: &NodeId) -> KegResult<()> {
        if self.store().has_node(id)? {
            Ok(())
        } else {
            Err(KegError::NotExist(format!("node {id}")))
        }
    }

    pub(crate) fn body_or_empty(&self, id: &NodeId) -> KegResult<Vec<u8>> {
        match self.store().read_content(id) {
            Err(err) if err.kind() == ErrorKind::NotExist => Ok(Vec::new()),
            other => other,
        }
    }

    /// Replace a node's body and refresh its stats.
    ///
    /// Returns `false` without writing when `data` equals the stored body.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for unknown nodes; metadata parse failures.
    pub fn write_content(&self, id: &NodeId, data: &[u8]) -> KegResult<bool> {
        self.require_node(id)?;
        let meta = self.read_meta(id)?;
        if self.body_or_empty(id)? == data {
            return Ok(false);
        }
        self.store().write_content(id, data)?;
        self.refresh_stats(id, data, &meta, true)?;
        Ok(true)
    }

    /// Validate and persist raw metadata YAML, then refresh stats.
    ///
    /// # Errors
    ///
    /// [`KegError::ParseFailure`] before anything is written when `raw` is invalid.
    pub fn write_meta(&self, id: &NodeId, raw: &str) -> KegResult<NodeMeta> {
        self.require_node(id)?;
        let meta = NodeMeta::parse(raw, &format!("meta.yaml for node {id}"))?;
        self.store().write_meta(id, raw.as_bytes())?;
        let body = self.body_or_empty(id)?;
        self.refresh_stats(id, &body, &meta, true)?;
        Ok(meta)
    }

    /// Persist structured metadata.
    ///
    /// # Errors
    ///
    /// Same as [`Keg::write_meta`].
    pub fn set_meta(&self, id: &NodeId, meta: &NodeMeta) -> KegResult<()> {
        self.write_meta(id, &meta.to_yaml()?).map(|_| ())
    }

    /// Bump `updated` and rederive stats without touching the body.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] for unknown nodes.
    pub fn touch(&self, id: &NodeId) -> KegResult<NodeStats> {
        self.require_node(id)?;
        let meta = self.read_meta(id)?;
        let body = self.body_or_empty(id)?;
        self.refresh_stats(id, &body, &meta, true)
    }

    /// Derive and store stats for `body`. `bump` forces `updated` to now.
    pub(crate) fn refresh_stats(
        &self,
        id: &NodeId,
        body: &[u8],
        meta: &NodeMeta,
        bump: bool,
    ) -> KegResult<NodeStats> {
        let now = Utc::now();
        let previous = stats_or_none(self.store().read_stats(id))?;
        let content = parse_content(body);
        let mut links = Vec::with_capacity(content.links.len());
        for target in content.links {
            if &target != id && self.store().has_node(&target)? {
                links.push(target);
            }
        }
        let (created, updated) = match &previous {
            Some(old) if !bump && old.hash == content.digest => (old.created, old.updated),
            Some(old) => (old.created, now),
            None => (now, now),
        };
        let stats = NodeStats {
            title: meta.title.clone().unwrap_or(content.title),
            hash: content.digest,
            created,
            updated,
            lead: meta.lead.clone().unwrap_or(content.lead),
            links,
        };
        if previous.as_ref() != Some(&stats) {
            self.store().write_stats(id, &stats)?;
        }
        Ok(stats)
    }

    /// Renumber `src` as `dst` and rewrite every reference to it across the keg.
    ///
    /// Returns the nodes whose bodies were rewritten. Rewriting continues past
    /// per-node failures; the first one is returned afterwards.
    ///
    /// # Errors
    ///
    /// [`KegError::NotExist`] when `src` is missing, [`KegError::DestinationExists`]
    /// when `dst` is taken, [`KegError::Invalid`] for node `0`.
    pub fn move_node(&self, src: &NodeId, dst: &NodeId) -> KegResult<Vec<NodeId>> {
        if src.is_zero() {
            return Err(KegError::invalid("move", "node 0 cannot be moved"));
        }
        self.store().move_node(src, dst)?;
        info!(from = %src, to = %dst, "moved node");

        let mut rewritten = Vec::new();
        let mut first_error: Option<KegError> = None;
        for id in self.store().list_nodes()? {
            match self.rewrite_node_references(&id, src, dst) {
                Ok(true) => rewritten.push(id),
                Ok(false) => {}
                Err(err) => {
                    warn!(node = %id, error = %err, "failed to rewrite references");
                    first_error
                        .get_or_insert(err.context(format!("rewriting references in node {id}")));
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(rewritten),
        }
    }

    fn rewrite_node_references(&self, id: &NodeId, src: &NodeId, dst: &NodeId) -> KegResult<bool> {
        let body = self.body_or_empty(id)?;
        let Ok(text) = std::str::from_utf8(&body) else {
            warn!(node = %id, "body is not UTF-8; references left as is");
            return Ok(false);
        };
        let Some(updated) = rewrite_references(text, src, dst) else {
            return Ok(false);
        };
        let meta = self.read_meta(id)?;
        self.store().write_content(id, updated.as_bytes())?;
        self.refresh_stats(id, updated.as_bytes(), &meta, true)?;
        Ok(true)
    }

    /// Delete a node. Node `0` is permanent.
    ///
    /// # Errors
    ///
    /// [`KegError::ZeroNodeProtected`] for node `0`, [`KegError::NotExist`] for unknown ids.
    pub fn remove(&self, id: &NodeId) -> KegResult<()> {
        if id.is_zero() {
            return Err(KegError::ZeroNodeProtected);
        }
        self.require_node(id)?;
        self.store().remove(id)?;
        info!(node = %id, "removed node");
        Ok(())
    }
}
