use std::ops::Range;
use std::sync::LazyLock;

use comrak::nodes::{AstNode, NodeValue};
use regex::Regex;

use super::compile_regex;
use crate::node_id::NodeId;

static REFERENCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| compile_regex(r"\.\./([0-9]+)(?:-([A-Za-z0-9]+))?"));

struct Reference {
    range: Range<usize>,
    id: NodeId,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Characters a reference may follow. Anything else (`/`, `:`, letters)
/// means the `../` is part of a longer path or URL.
fn opens_reference(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | '[' | '<' | '"' | '\'' | '*' | '~' | '`')
}

/// Every `../<id>` occurrence in `text` that starts a token and ends on a
/// word boundary.
fn scan_references(text: &str) -> Vec<Reference> {
    let mut out = Vec::new();
    for caps in REFERENCE_REGEX.captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let before = text[..whole.start()].chars().next_back();
        if before.is_some_and(|c| !opens_reference(c)) {
            continue;
        }
        let after = text[whole.end()..].chars().next();
        if after.is_some_and(is_word_char) {
            continue;
        }
        let Ok(id) = text[whole.start() + 3..whole.end()].parse::<NodeId>() else {
            continue;
        };
        out.push(Reference {
            range: whole.range(),
            id,
        });
    }
    out
}

/// Markdown link destinations must be exactly `../<id>` plus an optional
/// `/...`, `#fragment`, or `?query` tail.
fn normalize_link_destination(url: &str) -> Option<NodeId> {
    let trimmed = url.trim();
    let reference = scan_references(trimmed).into_iter().next()?;
    if reference.range.start != 0 {
        return None;
    }
    let tail = &trimmed[reference.range.end..];
    if tail.is_empty() || tail.starts_with(['/', '#', '?']) {
        Some(reference.id)
    } else {
        None
    }
}

fn push_unique(out: &mut Vec<NodeId>, id: NodeId) {
    if !out.contains(&id) {
        out.push(id);
    }
}

pub(super) fn extract_links<'a>(root: &'a AstNode<'a>) -> Vec<NodeId> {
    let mut out: Vec<NodeId> = Vec::new();
    for node in root.descendants() {
        match &node.data().value {
            NodeValue::Link(link) => {
                if let Some(id) = normalize_link_destination(&link.url) {
                    push_unique(&mut out, id);
                }
            }
            NodeValue::Text(text) => {
                for reference in scan_references(text) {
                    push_unique(&mut out, reference.id);
                }
            }
            _ => {}
        }
    }
    out
}

/// Replace every reference to `src` with a reference to `dst`.
///
/// Works on the raw text, so references inside code spans and fenced blocks
/// are renumbered too even though they never count as links. All other bytes
/// are preserved. Returns `None` when `body` has no reference to `src`.
#[must_use]
pub fn rewrite_references(body: &str, src: &NodeId, dst: &NodeId) -> Option<String> {
    let replacement = format!("../{dst}");
    let mut out = String::with_capacity(body.len());
    let mut cursor = 0usize;
    let mut changed = false;
    for reference in scan_references(body) {
        if &reference.id != src {
            continue;
        }
        out.push_str(&body[cursor..reference.range.start]);
        out.push_str(&replacement);
        cursor = reference.range.end;
        changed = true;
    }
    if !changed {
        return None;
    }
    out.push_str(&body[cursor..]);
    Some(out)
}
