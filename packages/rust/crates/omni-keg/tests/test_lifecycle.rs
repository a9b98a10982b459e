//! Integration tests for create / write / move / remove.

use std::collections::BTreeSet;

use omni_keg::store::{INDEX_BACKLINKS, INDEX_CHANGES, INDEX_LINKS, INDEX_NODES, INDEX_TAGS};
use omni_keg::{
    CreateOptions, ErrorKind, FsStore, IndexOptions, Keg, KegConfig, MemoryStore, NodeId,
    ZERO_NODE_BODY,
};
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn memory_keg() -> Result<Keg, Box<dyn std::error::Error>> {
    Ok(Keg::init(
        Box::new(MemoryStore::default()),
        KegConfig::titled("lifecycle"),
    )?)
}

fn dex_artifacts(keg: &Keg) -> Result<Vec<Vec<u8>>, Box<dyn std::error::Error>> {
    let mut out = Vec::new();
    for name in [INDEX_NODES, INDEX_TAGS, INDEX_LINKS, INDEX_BACKLINKS, INDEX_CHANGES] {
        out.push(keg.store().read_index(name)?);
    }
    Ok(out)
}

fn with_body(body: &str) -> CreateOptions {
    CreateOptions {
        body: Some(body.as_bytes().to_vec()),
        ..CreateOptions::default()
    }
}

#[test]
fn test_init_writes_zero_node() -> TestResult {
    let keg = memory_keg()?;
    assert_eq!(keg.read_content(&NodeId::ZERO)?, ZERO_NODE_BODY.as_bytes());
    assert_eq!(
        keg.dex().get_ref(&NodeId::ZERO).map(|row| row.title.as_str()),
        Some("Sorry, planned but not yet available")
    );
    assert!(keg.config().updated.is_some());
    assert_eq!(keg.config().title, "lifecycle");
    Ok(())
}

#[test]
fn test_init_refuses_existing_keg() -> TestResult {
    let tmp = TempDir::new()?;
    Keg::init(Box::new(FsStore::new(tmp.path())), KegConfig::default())?;
    let err = Keg::init(Box::new(FsStore::new(tmp.path())), KegConfig::default())
        .err()
        .ok_or("second init should fail")?;
    assert_eq!(err.kind(), ErrorKind::Invalid);
    Ok(())
}

#[test]
fn test_open_requires_config() -> TestResult {
    let tmp = TempDir::new()?;
    let err = Keg::open(Box::new(FsStore::new(tmp.path())))
        .err()
        .ok_or("open should fail")?;
    assert_eq!(err.kind(), ErrorKind::NotExist);
    Ok(())
}

#[test]
fn test_create_round_trip() -> TestResult {
    let mut keg = memory_keg()?;
    assert_eq!(keg.peek_next_id()?, NodeId::new(1));
    assert_eq!(keg.peek_next_id()?, NodeId::new(1));

    let id = keg.create(&CreateOptions {
        lead: Some("A short lead.".to_string()),
        tags: vec!["Rust".to_string(), "notes".to_string()],
        ..CreateOptions::titled("First Node")
    })?;
    assert_eq!(id, NodeId::new(1));
    assert_eq!(keg.read_content(&id)?, b"# First Node\n\nA short lead.\n");

    let stats = keg.read_stats(&id)?;
    assert_eq!(stats.title, "First Node");
    assert_eq!(stats.lead, "A short lead.");
    assert_eq!(stats.created, stats.updated);
    assert_eq!(keg.read_meta(&id)?.tags, vec!["notes", "rust"]);

    keg.index(IndexOptions::default())?;
    assert_eq!(keg.query_tags("rust")?, BTreeSet::from([id]));
    assert_eq!(keg.peek_next_id()?, NodeId::new(2));
    Ok(())
}

#[test]
fn test_write_content_refreshes_stats_and_skips_identical_bytes() -> TestResult {
    let keg = memory_keg()?;
    let id = keg.create(&CreateOptions::titled("Draft"))?;
    let before = keg.read_stats(&id)?;

    assert!(!keg.write_content(&id, b"# Draft\n")?);
    assert!(keg.write_content(&id, b"# Final\n\nDone, see ../0.\n")?);
    let after = keg.read_stats(&id)?;
    assert_eq!(after.title, "Final");
    assert_eq!(after.links, vec![NodeId::ZERO]);
    assert_eq!(after.created, before.created);
    assert!(after.updated >= before.updated);

    let missing = keg.write_content(&NodeId::new(50), b"x").err().ok_or("expected error")?;
    assert_eq!(missing.kind(), ErrorKind::NotExist);
    Ok(())
}

#[test]
fn test_write_meta_validates_before_writing() -> TestResult {
    let keg = memory_keg()?;
    let id = keg.create(&CreateOptions {
        tags: vec!["keep".to_string()],
        ..CreateOptions::titled("Meta")
    })?;
    let raw_before = keg.store().read_meta(&id)?;

    let err = keg.write_meta(&id, "tags: [broken\n").err().ok_or("expected parse failure")?;
    assert_eq!(err.kind(), ErrorKind::ParseFailure);
    assert_eq!(keg.store().read_meta(&id)?, raw_before);

    let meta = keg.write_meta(&id, "title: Renamed\ntags: [new]\nowner: me\n")?;
    assert_eq!(meta.tags, vec!["new"]);
    assert_eq!(keg.read_stats(&id)?.title, "Renamed");
    Ok(())
}

#[test]
fn test_touch_keeps_created() -> TestResult {
    let keg = memory_keg()?;
    let id = keg.create(&CreateOptions::titled("Touched"))?;
    let before = keg.read_stats(&id)?;
    let after = keg.touch(&id)?;
    assert_eq!(after.created, before.created);
    assert!(after.updated >= before.updated);
    Ok(())
}

#[test]
fn test_move_rewrites_references() -> TestResult {
    let tmp = TempDir::new()?;
    let mut keg = Keg::init(Box::new(FsStore::new(tmp.path())), KegConfig::default())?;
    let one = keg.create(&with_body("# One\n\nSee [two](../2).\nAlso ../2.\n"))?;
    let two = keg.create(&CreateOptions::titled("Two"))?;
    assert_eq!(two, NodeId::new(2));
    keg.index(IndexOptions::default())?;
    assert_eq!(keg.dex().backlinks(&two), &BTreeSet::from([one.clone()]));

    let three = NodeId::new(3);
    let rewritten = keg.move_node(&two, &three)?;
    assert_eq!(rewritten, vec![one.clone()]);

    let body = String::from_utf8(keg.read_content(&one)?)?;
    assert!(body.contains("[two](../3)"), "{body}");
    assert!(body.contains("../3."), "{body}");
    assert!(!body.contains("../2"), "{body}");
    assert!(!tmp.path().join("2").exists());
    assert!(tmp.path().join("3").join("README.md").is_file());
    assert_eq!(keg.read_stats(&one)?.links, vec![three.clone()]);

    keg.index(IndexOptions::default())?;
    assert!(keg.dex().get_ref(&two).is_none());
    assert_eq!(keg.dex().backlinks(&three), &BTreeSet::from([one]));
    Ok(())
}

#[test]
fn test_move_collision_and_missing_source() -> TestResult {
    let keg = memory_keg()?;
    let one = keg.create(&CreateOptions::titled("One"))?;
    let two = keg.create(&CreateOptions::titled("Two"))?;

    let err = keg.move_node(&one, &two).err().ok_or("collision expected")?;
    assert_eq!(err.kind(), ErrorKind::DestinationExists);
    assert!(keg.store().has_node(&one)?);

    let err = keg
        .move_node(&NodeId::new(99), &NodeId::new(100))
        .err()
        .ok_or("missing source expected")?;
    assert_eq!(err.kind(), ErrorKind::NotExist);

    let err = keg.move_node(&NodeId::ZERO, &NodeId::new(5)).err().ok_or("zero move")?;
    assert_eq!(err.kind(), ErrorKind::Invalid);
    Ok(())
}

#[test]
fn test_remove_guards() -> TestResult {
    let keg = memory_keg()?;
    let id = keg.create(&CreateOptions::titled("Temp"))?;
    let dex_before = keg.dex().clone();
    let artifacts_before = dex_artifacts(&keg)?;

    let err = keg.remove(&NodeId::ZERO).err().ok_or("zero removal")?;
    assert_eq!(err.to_string(), "node 0 cannot be removed");
    let err = keg.remove(&NodeId::new(999)).err().ok_or("missing removal")?;
    assert_eq!(err.kind(), ErrorKind::NotExist);
    assert_eq!(keg.dex(), &dex_before);
    assert_eq!(dex_artifacts(&keg)?, artifacts_before);

    keg.remove(&id)?;
    assert!(!keg.store().has_node(&id)?);
    assert_eq!(dex_artifacts(&keg)?, artifacts_before);
    Ok(())
}

#[test]
fn test_attachments_depend_on_backend() -> TestResult {
    let memory = memory_keg()?;
    let err = memory.files().err().ok_or("memory has no files")?;
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert_eq!(
        memory.images().err().map(|e| e.to_string()),
        Some("backend does not support image attachments".to_string())
    );

    let tmp = TempDir::new()?;
    let keg = Keg::init(Box::new(FsStore::new(tmp.path())), KegConfig::default())?;
    let files = keg.files()?;
    files.write_file(&NodeId::ZERO, "notes.txt", b"hello")?;
    assert_eq!(files.list_files(&NodeId::ZERO)?, vec!["notes.txt"]);
    assert_eq!(files.read_file(&NodeId::ZERO, "notes.txt")?, b"hello");
    assert_eq!(
        files.write_file(&NodeId::ZERO, "../escape", b"x").err().map(|e| e.kind()),
        Some(ErrorKind::Invalid)
    );
    Ok(())
}
