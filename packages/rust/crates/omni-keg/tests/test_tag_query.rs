//! Integration tests for boolean tag expressions over a keg's tag index.

use std::collections::BTreeSet;

use omni_keg::{
    CreateOptions, ErrorKind, IndexOptions, Keg, KegConfig, MemoryStore, NodeId, TagExpr,
    evaluate, parse_tag_expression,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn ids(raw: &[u64]) -> BTreeSet<NodeId> {
    raw.iter().copied().map(NodeId::new).collect()
}

/// Node 0 is untagged; 1:{a,b} 2:{a,c} 3:{c} 4:{or, big-idea}.
fn tagged_keg() -> Result<Keg, Box<dyn std::error::Error>> {
    let mut keg = Keg::init(Box::new(MemoryStore::default()), KegConfig::titled("tags"))?;
    for (title, tags) in [
        ("One", vec!["a", "b"]),
        ("Two", vec!["A", "c"]),
        ("Three", vec!["c"]),
        ("Four", vec!["or", "Big Idea"]),
    ] {
        keg.create(&CreateOptions {
            tags: tags.into_iter().map(str::to_string).collect(),
            ..CreateOptions::titled(title)
        })?;
    }
    keg.index(IndexOptions::default())?;
    Ok(keg)
}

#[test]
fn test_documented_examples() -> TestResult {
    let keg = tagged_keg()?;
    assert_eq!(keg.query_tags("a and (b or c)")?, ids(&[1, 2]));
    assert_eq!(keg.query_tags("a and not c")?, ids(&[1]));
    assert_eq!(keg.query_tags("not a")?, ids(&[0, 3, 4]));
    Ok(())
}

#[test]
fn test_symbol_operators_and_case() -> TestResult {
    let keg = tagged_keg()?;
    assert_eq!(keg.query_tags("A && !C")?, ids(&[1]));
    assert_eq!(keg.query_tags("b || c")?, ids(&[1, 2, 3]));
    assert_eq!(keg.query_tags("NOT (a OR c)")?, ids(&[0, 4]));
    Ok(())
}

#[test]
fn test_quoted_reserved_words_and_multiword_tags() -> TestResult {
    let keg = tagged_keg()?;
    assert_eq!(keg.query_tags("\"or\"")?, ids(&[4]));
    assert_eq!(keg.query_tags("'big idea' and 'OR'")?, ids(&[4]));
    assert_eq!(keg.query_tags("unknown")?, ids(&[]));
    Ok(())
}

#[test]
fn test_invalid_expressions_are_rejected() -> TestResult {
    let keg = tagged_keg()?;
    for raw in ["", "(a and b", "a or", "or a", "a & b", "a | b", "a) or (b", "\"a"] {
        let err = keg.query_tags(raw).err().ok_or(format!("{raw:?} should fail"))?;
        assert_eq!(err.kind(), ErrorKind::ParseFailure, "{raw:?}");
        assert!(err.to_string().contains("invalid tag expression"), "{raw:?}: {err}");
    }
    Ok(())
}

#[test]
fn test_evaluate_clips_to_universe() -> TestResult {
    let expr = parse_tag_expression("x or not y")?;
    assert!(matches!(expr, TagExpr::Or(_, _)));
    let universe = ids(&[1, 2]);
    let result = evaluate(&expr, &universe, |tag| match tag {
        "x" => ids(&[5]),
        "y" => ids(&[1]),
        _ => BTreeSet::new(),
    });
    assert_eq!(result, ids(&[2]));
    Ok(())
}
