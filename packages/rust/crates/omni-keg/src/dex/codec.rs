//! Text formats of the dex artifacts.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{KegError, KegResult};
use crate::model::NodeRef;
use crate::node_id::NodeId;
use crate::store::{INDEX_NODES, INDEX_TAGS};

fn sanitize_title(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn line_error(artifact: &str, line_no: usize, reason: impl std::fmt::Display) -> KegError {
    KegError::parse(format!("dex/{artifact}"), format!("line {line_no}: {reason}"))
}

fn parse_id(artifact: &str, line_no: usize, raw: &str) -> KegResult<NodeId> {
    raw.parse::<NodeId>()
        .map_err(|e| line_error(artifact, line_no, e))
}

fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// `id\tupdated\ttitle` per node, ascending id.
pub(super) fn encode_nodes(nodes: &BTreeMap<NodeId, NodeRef>) -> String {
    let mut out = String::new();
    for node in nodes.values() {
        let _ = writeln!(
            out,
            "{}\t{}\t{}",
            node.id,
            node.updated.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            sanitize_title(&node.title)
        );
    }
    out
}

pub(super) fn decode_nodes(text: &str) -> KegResult<BTreeMap<NodeId, NodeRef>> {
    let mut out = BTreeMap::new();
    for (line_no, line) in content_lines(text) {
        let mut fields = line.splitn(3, '\t');
        let (Some(id), Some(updated)) = (fields.next(), fields.next()) else {
            return Err(line_error(INDEX_NODES, line_no, "expected id<TAB>updated<TAB>title"));
        };
        let id = parse_id(INDEX_NODES, line_no, id)?;
        let updated = DateTime::parse_from_rfc3339(updated)
            .map_err(|e| line_error(INDEX_NODES, line_no, e))?
            .with_timezone(&Utc);
        let title = fields.next().unwrap_or_default().to_string();
        out.insert(id.clone(), NodeRef { id, title, updated });
    }
    Ok(out)
}

/// `tag id id ...` per tag, sorted by tag.
pub(super) fn encode_tags(tags: &BTreeMap<String, BTreeSet<NodeId>>) -> String {
    let mut out = String::new();
    for (tag, ids) in tags {
        out.push_str(tag);
        for id in ids {
            out.push(' ');
            out.push_str(&id.path());
        }
        out.push('\n');
    }
    out
}

pub(super) fn decode_tags(text: &str) -> KegResult<BTreeMap<String, BTreeSet<NodeId>>> {
    let mut out: BTreeMap<String, BTreeSet<NodeId>> = BTreeMap::new();
    for (line_no, line) in content_lines(text) {
        let mut fields = line.split_whitespace();
        let Some(tag) = fields.next() else {
            continue;
        };
        let ids = out.entry(tag.to_string()).or_default();
        for raw in fields {
            ids.insert(parse_id(INDEX_TAGS, line_no, raw)?);
        }
    }
    Ok(out)
}

/// `id\tid id ...` per source with at least one target.
pub(super) fn encode_link_map(links: &BTreeMap<NodeId, BTreeSet<NodeId>>) -> String {
    let mut out = String::new();
    for (source, targets) in links {
        if targets.is_empty() {
            continue;
        }
        let rendered: Vec<String> = targets.iter().map(NodeId::path).collect();
        let _ = writeln!(out, "{source}\t{}", rendered.join(" "));
    }
    out
}

pub(super) fn decode_link_map(
    text: &str,
    artifact: &str,
) -> KegResult<BTreeMap<NodeId, BTreeSet<NodeId>>> {
    let mut out: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
    for (line_no, line) in content_lines(text) {
        let (source, targets) = line.split_once('\t').unwrap_or((line, ""));
        let source = parse_id(artifact, line_no, source.trim())?;
        let mut set = BTreeSet::new();
        for raw in targets.split_whitespace() {
            set.insert(parse_id(artifact, line_no, raw)?);
        }
        if !set.is_empty() {
            out.insert(source, set);
        }
    }
    Ok(out)
}

/// Markdown change log, most recently updated first.
pub(super) fn encode_changes(nodes: &BTreeMap<NodeId, NodeRef>) -> String {
    let mut rows: Vec<&NodeRef> = nodes.values().collect();
    rows.sort_by(|a, b| b.updated.cmp(&a.updated).then_with(|| a.id.cmp(&b.id)));
    let mut out = String::from("# Changes\n\n");
    for row in rows {
        let title = sanitize_title(&row.title);
        let label = if title.is_empty() { row.id.path() } else { title };
        let _ = writeln!(
            out,
            "* {} [{}](../{})",
            row.updated.format("%Y-%m-%d %H:%M:%SZ"),
            label,
            row.id
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crate::error::ErrorKind;

    fn node(id: u64, title: &str, secs: i64) -> NodeRef {
        NodeRef {
            id: NodeId::new(id),
            title: title.to_string(),
            updated: Utc.timestamp_opt(secs, 0).single().unwrap_or_default(),
        }
    }

    #[test]
    fn test_nodes_tsv_round_trip_and_sanitized_titles() -> KegResult<()> {
        let mut nodes = BTreeMap::new();
        nodes.insert(NodeId::new(1), node(1, "Tabbed\ttitle", 1_700_000_000));
        nodes.insert(NodeId::new(0), node(0, "Zero", 1_600_000_000));
        let text = encode_nodes(&nodes);
        assert!(text.starts_with("0\t2020-09-13T12:26:40Z\tZero\n"));
        let decoded = decode_nodes(&text)?;
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[&NodeId::new(1)].title, "Tabbed title");
        Ok(())
    }

    #[test]
    fn test_link_map_round_trip() -> KegResult<()> {
        let mut links: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        links.insert(NodeId::new(3), [NodeId::new(1), NodeId::new(2)].into());
        let text = encode_link_map(&links);
        assert_eq!(text, "3\t1 2\n");
        assert_eq!(decode_link_map(&text, "links")?, links);
        Ok(())
    }

    #[test]
    fn test_malformed_artifact_is_parse_failure() {
        let err = decode_tags("rust 1 two\n").err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::ParseFailure));
        let err = decode_nodes("5\tyesterday\tTitle\n").err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::ParseFailure));
    }

    #[test]
    fn test_changes_orders_newest_first() {
        let mut nodes = BTreeMap::new();
        nodes.insert(NodeId::new(1), node(1, "Old", 1_600_000_000));
        nodes.insert(NodeId::new(2), node(2, "", 1_700_000_000));
        let text = encode_changes(&nodes);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "# Changes");
        assert_eq!(lines[2], "* 2023-11-14 22:13:20Z [2](../2)");
        assert_eq!(lines[3], "* 2020-09-13 12:26:40Z [Old](../1)");
    }
}
