//! Full and incremental index construction.
//!
//! A run is split into phases so that a malformed node aborts it before any
//! stats, metadata, or dex artifact has been written:
//!
//! 1. load every node's metadata, stats and body (validating metadata);
//! 2. compute fresh stats for candidate nodes and assemble the new [`Dex`];
//! 3. persist repaired stats and missing metadata files.
//!
//! The caller writes the returned dex afterwards.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use memchr::memmem;
use rayon::prelude::*;
use tracing::{debug, warn};

use super::{Dex, IndexOptions, IndexReport};
use crate::error::{ErrorKind, KegError, KegResult, ResultExt};
use crate::model::{NodeMeta, NodeRef, NodeStats};
use crate::node_id::NodeId;
use crate::parser::{content_digest, parse_content};
use crate::store::NodeStore;

struct LoadedNode {
    id: NodeId,
    meta: Option<NodeMeta>,
    stats: Option<NodeStats>,
    body: Vec<u8>,
}

enum Outcome {
    Fresh {
        stats: NodeStats,
        tags: Vec<String>,
        stats_dirty: bool,
        create_meta: Option<NodeMeta>,
    },
    Carried,
}

fn allow_missing<T>(result: KegResult<T>) -> KegResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.kind() == ErrorKind::NotExist => Ok(None),
        Err(err) => Err(err),
    }
}

fn load_node(store: &dyn NodeStore, id: NodeId) -> KegResult<LoadedNode> {
    let subject = format!("meta.yaml for node {id}");
    let meta = match allow_missing(store.read_meta(&id))? {
        Some(raw) => {
            let text = String::from_utf8(raw).map_err(|e| KegError::parse(&subject, e))?;
            Some(NodeMeta::parse(&text, &subject)?)
        }
        None => None,
    };
    let stats = match store.read_stats(&id) {
        Ok(stats) => Some(stats),
        Err(err) if matches!(err.kind(), ErrorKind::NotExist | ErrorKind::ParseFailure) => {
            debug!(node = %id, error = %err, "stats unavailable; node will be reprocessed");
            None
        }
        Err(err) => return Err(err),
    };
    let body = allow_missing(store.read_content(&id))?.unwrap_or_default();
    Ok(LoadedNode {
        id,
        meta,
        stats,
        body,
    })
}

/// `../<id>` needles for ids missing from the previous listing. Stats only
/// keep links that resolved when written, so a body mentioning one of these
/// may have gained a link.
fn arrival_needles(previous: &Dex, universe: &BTreeSet<NodeId>) -> Vec<String> {
    universe
        .iter()
        .filter(|id| previous.get_ref(id).is_none())
        .map(|id| format!("../{id}"))
        .collect()
}

fn is_candidate(
    node: &LoadedNode,
    previous: &Dex,
    checkpoint: Option<DateTime<Utc>>,
    rebuild: bool,
    arrivals: &[String],
) -> bool {
    if rebuild || node.meta.is_none() || previous.get_ref(&node.id).is_none() {
        return true;
    }
    let Some(stats) = &node.stats else {
        return true;
    };
    if checkpoint.is_none_or(|checkpoint| stats.updated > checkpoint) {
        return true;
    }
    if let Some(needle) = arrivals
        .iter()
        .find(|needle| memmem::find(&node.body, needle.as_bytes()).is_some())
    {
        debug!(node = %node.id, reference = %needle, "body mentions a new node");
        return true;
    }
    content_digest(&node.body) != stats.hash
}

/// Resolvable, non-self targets in first-occurrence order.
fn resolved_links(id: &NodeId, links: &[NodeId], universe: &BTreeSet<NodeId>) -> Vec<NodeId> {
    links
        .iter()
        .filter(|target| *target != id && universe.contains(*target))
        .cloned()
        .collect()
}

fn process(node: &LoadedNode, universe: &BTreeSet<NodeId>, now: DateTime<Utc>) -> Outcome {
    let content = parse_content(&node.body);
    let meta = node.meta.clone().unwrap_or_default();
    let title = meta.title.clone().unwrap_or_else(|| content.title.clone());
    let lead = meta.lead.clone().unwrap_or_else(|| content.lead.clone());
    let links = resolved_links(&node.id, &content.links, universe);

    let (created, updated) = match &node.stats {
        Some(old) if old.hash == content.digest => (old.created, old.updated),
        Some(old) => (old.created, now),
        None => (now, now),
    };
    let stats = NodeStats {
        title,
        hash: content.digest,
        created,
        updated,
        lead,
        links,
    };
    let stats_dirty = node.stats.as_ref() != Some(&stats);
    let create_meta = node.meta.is_none().then(|| NodeMeta {
        title: (!content.title.is_empty()).then(|| content.title.clone()),
        ..NodeMeta::default()
    });
    Outcome::Fresh {
        stats,
        tags: meta.tags,
        stats_dirty,
        create_meta,
    }
}

/// Run phases 1-3 and return the dex to publish.
pub(crate) fn rebuild_dex(
    store: &dyn NodeStore,
    previous: &Dex,
    checkpoint: Option<DateTime<Utc>>,
    options: IndexOptions,
    now: DateTime<Utc>,
) -> KegResult<(Dex, IndexReport)> {
    let ids = store.list_nodes()?;
    let loaded: Vec<LoadedNode> = ids
        .into_par_iter()
        .map(|id| load_node(store, id))
        .collect::<KegResult<Vec<_>>>()
        .with_context(|| "index aborted")?;

    let universe: BTreeSet<NodeId> = loaded.iter().map(|node| node.id.clone()).collect();
    let arrivals = if options.rebuild {
        Vec::new()
    } else {
        arrival_needles(previous, &universe)
    };
    let outcomes: Vec<Outcome> = loaded
        .par_iter()
        .map(|node| {
            if is_candidate(node, previous, checkpoint, options.rebuild, &arrivals) {
                process(node, &universe, now)
            } else {
                Outcome::Carried
            }
        })
        .collect();

    let mut report = IndexReport {
        rebuild: options.rebuild,
        nodes: loaded.len(),
        removed: previous
            .nodes
            .keys()
            .filter(|id| !universe.contains(*id))
            .count(),
        ..IndexReport::default()
    };

    let mut nodes: BTreeMap<NodeId, NodeRef> = BTreeMap::new();
    let mut links: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    let mut fresh_tags: Vec<(NodeId, Vec<String>)> = Vec::new();
    let mut stats_writes: Vec<(NodeId, NodeStats)> = Vec::new();
    let mut meta_writes: Vec<(NodeId, NodeMeta)> = Vec::new();

    for (node, outcome) in loaded.iter().zip(outcomes) {
        match outcome {
            Outcome::Fresh {
                stats,
                tags,
                stats_dirty,
                create_meta,
            } => {
                report.processed += 1;
                nodes.insert(
                    node.id.clone(),
                    NodeRef {
                        id: node.id.clone(),
                        title: stats.title.clone(),
                        updated: stats.updated,
                    },
                );
                links.insert(node.id.clone(), stats.links.iter().cloned().collect());
                fresh_tags.push((node.id.clone(), tags));
                if stats_dirty {
                    stats_writes.push((node.id.clone(), stats));
                }
                if let Some(meta) = create_meta {
                    meta_writes.push((node.id.clone(), meta));
                }
            }
            Outcome::Carried => {
                report.unchanged += 1;
                if let Some(row) = previous.get_ref(&node.id) {
                    nodes.insert(node.id.clone(), row.clone());
                }
                let carried = node.stats.as_ref().map_or(&[][..], |stats| &stats.links);
                links.insert(
                    node.id.clone(),
                    resolved_links(&node.id, carried, &universe).into_iter().collect(),
                );
            }
        }
    }

    // Carried nodes keep their previous tag entries; fresh nodes replace theirs.
    let fresh_ids: BTreeSet<&NodeId> = fresh_tags.iter().map(|(id, _)| id).collect();
    let mut tags: BTreeMap<String, BTreeSet<NodeId>> = BTreeMap::new();
    if !options.rebuild {
        for (tag, ids) in &previous.tags {
            let kept: BTreeSet<NodeId> = ids
                .iter()
                .filter(|id| universe.contains(*id) && !fresh_ids.contains(id))
                .cloned()
                .collect();
            if !kept.is_empty() {
                tags.insert(tag.clone(), kept);
            }
        }
    }
    for (id, node_tags) in fresh_tags {
        for tag in node_tags {
            tags.entry(tag).or_default().insert(id.clone());
        }
    }

    if !options.no_update {
        for (id, meta) in &meta_writes {
            warn!(node = %id, "meta.yaml missing; creating it");
            store.write_meta(id, meta.to_yaml()?.as_bytes())?;
            report.meta_created += 1;
        }
        for (id, stats) in &stats_writes {
            debug!(node = %id, "writing refreshed stats");
            store.write_stats(id, stats)?;
            report.stats_written += 1;
        }
    }

    Ok((Dex::from_parts(nodes, tags, links), report))
}
