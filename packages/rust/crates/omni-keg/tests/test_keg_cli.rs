//! Integration tests for the `keg` CLI binary.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde_json::Value;
use tempfile::TempDir;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn keg_cmd(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_keg"));
    cmd.env_remove("KEG_TARGET")
        .env_remove("RUST_LOG")
        .arg("--keg")
        .arg(root);
    cmd
}

fn run_json(root: &Path, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
    let output = keg_cmd(root).args(args).arg("--output").arg("json").output()?;
    assert!(
        output.status.success(),
        "keg {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(serde_json::from_slice(&output.stdout)?)
}

fn run_with_stdin(root: &Path, args: &[&str], stdin: &[u8]) -> Result<Output, Box<dyn std::error::Error>> {
    let mut child = keg_cmd(root)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    child.stdin.take().ok_or("stdin not captured")?.write_all(stdin)?;
    Ok(child.wait_with_output()?)
}

#[test]
fn test_init_create_and_list() -> TestResult {
    let tmp = TempDir::new()?;
    let root = tmp.path();

    let init = run_json(root, &["init", "--title", "CLI keg"])?;
    assert_eq!(init.get("nodes").and_then(Value::as_u64), Some(1));
    assert!(root.join("keg").is_file());
    assert!(root.join("0").join("README.md").is_file());

    let created = run_json(root, &["create", "--title", "Alpha", "--tag", "rust"])?;
    assert_eq!(created.get("id").and_then(Value::as_str), Some("1"));

    let piped = run_with_stdin(
        root,
        &["create", "--tag", "rust", "--tag", "cli"],
        b"# Piped Beta\n\nLinks to ../1.\n",
    )?;
    assert!(piped.status.success(), "{}", String::from_utf8_lossy(&piped.stderr));
    assert_eq!(String::from_utf8(piped.stdout)?.trim(), "2");

    let nodes = run_json(root, &["nodes"])?;
    let titles: Vec<&str> = nodes
        .as_array()
        .ok_or("nodes is not an array")?
        .iter()
        .filter_map(|row| row.get("title").and_then(Value::as_str))
        .collect();
    assert_eq!(
        titles,
        vec!["Sorry, planned but not yet available", "Alpha", "Piped Beta"]
    );

    let tagged = run_json(root, &["tags", "rust and not cli"])?;
    let ids: Vec<&str> = tagged
        .as_array()
        .ok_or("tags result is not an array")?
        .iter()
        .filter_map(|row| row.get("id").and_then(Value::as_str))
        .collect();
    assert_eq!(ids, vec!["1"]);

    let backlinks = run_json(root, &["backlinks", "1"])?;
    assert_eq!(
        backlinks.get(0).and_then(|row| row.get("id")).and_then(Value::as_str),
        Some("2")
    );
    Ok(())
}

#[test]
fn test_mv_rewrites_and_rm_guards_zero() -> TestResult {
    let tmp = TempDir::new()?;
    let root = tmp.path();
    run_json(root, &["init"])?;
    run_json(root, &["create", "--title", "Target"])?;
    let piped = run_with_stdin(root, &["create"], b"# Source\n\nSee [target](../1).\n")?;
    assert!(piped.status.success());

    let moved = run_json(root, &["mv", "1", "7"])?;
    assert_eq!(moved.get("rewritten").and_then(Value::as_array).map(Vec::len), Some(1));
    let body = std::fs::read_to_string(root.join("2").join("README.md"))?;
    assert!(body.contains("[target](../7)"), "{body}");

    let next = run_json(root, &["next"])?;
    assert_eq!(next.get("id").and_then(Value::as_str), Some("8"));

    let rm_zero = keg_cmd(root).args(["rm", "0"]).output()?;
    assert!(!rm_zero.status.success());
    assert!(String::from_utf8_lossy(&rm_zero.stderr).contains("node 0 cannot be removed"));
    Ok(())
}

#[test]
fn test_invalid_tag_expression_fails() -> TestResult {
    let tmp = TempDir::new()?;
    run_json(tmp.path(), &["init"])?;
    let output = keg_cmd(tmp.path()).args(["tags", "(a or"]).output()?;
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid tag expression"));
    Ok(())
}

#[test]
fn test_open_without_init_fails() -> TestResult {
    let tmp = TempDir::new()?;
    let output = keg_cmd(tmp.path()).arg("nodes").output()?;
    assert!(!output.status.success());
    Ok(())
}
