//! Integration tests for node body parsing and reference rewriting.

use omni_keg::parser::{compose_document, content_digest, rewrite_references, split_frontmatter};
use omni_keg::{NodeId, parse_content};

#[test]
fn test_parse_title_lead_and_links() {
    let body = b"# Keg Engine\n\nSee [the index](../12) and ../3 for details.\n\n\
Later paragraph mentions ../4 and [again](../12#top).\n\n`../9` is code.\n\n```\n../10\n```\n";
    let content = parse_content(body);
    assert_eq!(content.title, "Keg Engine");
    assert_eq!(content.lead, "See the index and ../3 for details.");
    assert_eq!(
        content.links,
        vec![NodeId::new(12), NodeId::new(3), NodeId::new(4)]
    );
    assert_eq!(content.digest, content_digest(body));
}

#[test]
fn test_parse_is_stable_for_identical_bytes() {
    let body = b"# Same\n\nBody ../1.\n";
    assert_eq!(parse_content(body), parse_content(body));
    assert_ne!(parse_content(body).digest, parse_content(b"# Same\n\nBody ../2.\n").digest);
}

#[test]
fn test_external_and_absolute_links_are_not_references() {
    let content = parse_content(
        b"Links: [web](https://example.com/../5), [abs](/7), [deep](../../8), x../9, ../10a.\n",
    );
    assert!(content.links.is_empty(), "{:?}", content.links);

    let prose = parse_content(b"# T\n\nSee http://example.com/../3 now, or file:../4.\n");
    assert!(prose.links.is_empty(), "{:?}", prose.links);
}

#[test]
fn test_rewrite_leaves_urls_alone() {
    let body = "Mirror at http://example.com/../2 and local (../2).\n";
    let rewritten = rewrite_references(body, &NodeId::new(2), &NodeId::new(5));
    assert_eq!(
        rewritten.as_deref(),
        Some("Mirror at http://example.com/../2 and local (../5).\n")
    );
}

#[test]
fn test_rewrite_move_scenario() -> Result<(), Box<dyn std::error::Error>> {
    let body = "See [two](../2).\nAlso ../2.\nNot ../20 or ../12.\n";
    let rewritten = rewrite_references(body, &NodeId::new(2), &NodeId::new(3))
        .ok_or("expected a rewrite")?;
    assert_eq!(rewritten, "See [two](../3).\nAlso ../3.\nNot ../20 or ../12.\n");
    Ok(())
}

#[test]
fn test_frontmatter_compose_then_split() -> Result<(), Box<dyn std::error::Error>> {
    let doc = compose_document("title: X\ntags: [a]\n", "# Body\n");
    let (yaml, body) = split_frontmatter(&doc)?;
    assert_eq!(yaml, Some("title: X\ntags: [a]\n"));
    assert_eq!(body, "# Body\n");
    Ok(())
}
