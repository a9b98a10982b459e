//! Node body parsing: title, lead, outbound references, digest.

mod content;
mod digest;
mod frontmatter;
mod links;

use comrak::{Arena, Options, parse_document};
use regex::Regex;

use crate::node_id::NodeId;

pub use self::digest::content_digest;
pub use self::frontmatter::{compose_document, split_frontmatter};
pub use self::links::rewrite_references;

/// Parser output for one node body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Content {
    /// First level-1 heading, whitespace collapsed. Empty when absent.
    pub title: String,
    /// First non-empty paragraph after the title.
    pub lead: String,
    /// Relative node references in first-occurrence order, deduplicated.
    pub links: Vec<NodeId>,
    /// Digest of the raw bytes.
    pub digest: String,
}

pub(crate) fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_compile_err) => match Regex::new(r"$^") {
            Ok(fallback) => fallback,
            Err(fallback_err) => panic!("hardcoded fallback regex must compile: {fallback_err}"),
        },
    }
}

/// Parse a raw node body. Identical bytes always yield identical output.
#[must_use]
pub fn parse_content(raw: &[u8]) -> Content {
    let text = String::from_utf8_lossy(raw);
    let arena = Arena::new();
    let root = parse_document(&arena, &text, &Options::default());
    let (title, lead) = content::extract_title_and_lead(root);
    let links = links::extract_links(root);
    Content {
        title,
        lead,
        links,
        digest: content_digest(raw),
    }
}
