//! Derived per-keg index ("dex"): node listing, tags, links, backlinks.

mod build;
mod codec;

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{KegError, KegResult};
use crate::model::{NodeRef, normalize_tag};
use crate::node_id::NodeId;
use crate::query::{TagExpr, evaluate};
use crate::store::{
    INDEX_BACKLINKS, INDEX_CHANGES, INDEX_LINKS, INDEX_NODES, INDEX_TAGS, NodeStore,
};

pub(crate) use self::build::rebuild_dex;

static EMPTY: BTreeSet<NodeId> = BTreeSet::new();

/// Options for one index run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexOptions {
    /// Reprocess every node and rewrite the dex from scratch.
    pub rebuild: bool,
    /// Do not write repaired `stats.json` / `meta.yaml` files.
    pub no_update: bool,
}

impl IndexOptions {
    /// Full rebuild with stats repair.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            rebuild: true,
            no_update: false,
        }
    }
}

/// Summary of one index run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    /// Whether this was a full rebuild.
    pub rebuild: bool,
    /// Nodes in the keg after the run.
    pub nodes: usize,
    /// Nodes reparsed this run.
    pub processed: usize,
    /// Nodes carried over without reparsing.
    pub unchanged: usize,
    /// Listing entries dropped because their node is gone.
    pub removed: usize,
    /// `stats.json` files written.
    pub stats_written: usize,
    /// `meta.yaml` files created.
    pub meta_created: usize,
}

/// In-memory view of the dex artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dex {
    nodes: BTreeMap<NodeId, NodeRef>,
    tags: BTreeMap<String, BTreeSet<NodeId>>,
    links: BTreeMap<NodeId, BTreeSet<NodeId>>,
    backlinks: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

/// Invert a link map: `result[n] == {m : n ∈ links[m]}`.
#[must_use]
pub fn invert_links(
    links: &BTreeMap<NodeId, BTreeSet<NodeId>>,
) -> BTreeMap<NodeId, BTreeSet<NodeId>> {
    let mut out: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for (source, targets) in links {
        for target in targets {
            out.entry(target.clone())
                .or_default()
                .insert(source.clone());
        }
    }
    out
}

impl Dex {
    pub(crate) fn from_parts(
        nodes: BTreeMap<NodeId, NodeRef>,
        mut tags: BTreeMap<String, BTreeSet<NodeId>>,
        mut links: BTreeMap<NodeId, BTreeSet<NodeId>>,
    ) -> Self {
        tags.retain(|_, ids| !ids.is_empty());
        links.retain(|_, targets| !targets.is_empty());
        let backlinks = invert_links(&links);
        Self {
            nodes,
            tags,
            links,
            backlinks,
        }
    }

    /// Listing rows in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeRef> + '_ {
        self.nodes.values()
    }

    /// Every indexed id (the tag query universe).
    #[must_use]
    pub fn node_ids(&self) -> BTreeSet<NodeId> {
        self.nodes.keys().cloned().collect()
    }

    /// Number of indexed nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Cached listing row.
    #[must_use]
    pub fn get_ref(&self, id: &NodeId) -> Option<&NodeRef> {
        self.nodes.get(id)
    }

    /// Outbound links of a node.
    #[must_use]
    pub fn links(&self, id: &NodeId) -> &BTreeSet<NodeId> {
        self.links.get(id).unwrap_or(&EMPTY)
    }

    /// Nodes linking to `id`.
    #[must_use]
    pub fn backlinks(&self, id: &NodeId) -> &BTreeSet<NodeId> {
        self.backlinks.get(id).unwrap_or(&EMPTY)
    }

    /// Sorted, unique tag names.
    #[must_use]
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags.keys().map(String::as_str).collect()
    }

    /// Nodes carrying `tag` (normalized before lookup).
    #[must_use]
    pub fn tag_nodes(&self, tag: &str) -> &BTreeSet<NodeId> {
        normalize_tag(tag)
            .and_then(|tag| self.tags.get(&tag))
            .unwrap_or(&EMPTY)
    }

    /// Evaluate a parsed tag expression against this dex.
    #[must_use]
    pub fn evaluate(&self, expr: &TagExpr) -> BTreeSet<NodeId> {
        evaluate(expr, &self.node_ids(), |tag| self.tag_nodes(tag).clone())
    }

    /// Load all artifacts. Missing artifacts yield empty sections.
    ///
    /// # Errors
    ///
    /// [`KegError::ParseFailure`] when an artifact is malformed; backend failures.
    pub fn load(store: &dyn NodeStore) -> KegResult<Self> {
        let read = |name: &str| -> KegResult<String> {
            match store.read_index(name) {
                Ok(raw) => String::from_utf8(raw).map_err(|e| KegError::parse(format!("dex/{name}"), e)),
                Err(err) if err.kind() == crate::error::ErrorKind::NotExist => Ok(String::new()),
                Err(err) => Err(err),
            }
        };
        Ok(Self {
            nodes: codec::decode_nodes(&read(INDEX_NODES)?)?,
            tags: codec::decode_tags(&read(INDEX_TAGS)?)?,
            links: codec::decode_link_map(&read(INDEX_LINKS)?, INDEX_LINKS)?,
            backlinks: codec::decode_link_map(&read(INDEX_BACKLINKS)?, INDEX_BACKLINKS)?,
        })
    }

    /// Write every artifact. All artifacts are rendered before the first write.
    ///
    /// # Errors
    ///
    /// Backend failures.
    pub fn write(&self, store: &dyn NodeStore) -> KegResult<()> {
        let rendered = [
            (INDEX_NODES, codec::encode_nodes(&self.nodes)),
            (INDEX_TAGS, codec::encode_tags(&self.tags)),
            (INDEX_LINKS, codec::encode_link_map(&self.links)),
            (INDEX_BACKLINKS, codec::encode_link_map(&self.backlinks)),
            (INDEX_CHANGES, codec::encode_changes(&self.nodes)),
        ];
        for (name, body) in rendered {
            store.write_index(name, body.as_bytes())?;
        }
        Ok(())
    }
}
