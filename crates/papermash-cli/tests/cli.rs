//! Integration tests for the papermash CLI commands.
//!
//! Only the snapshot commands are exercised here since they run offline.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use serial_test::serial;
use tempfile::tempdir;

// Helper function to create a clean command instance
fn papermash() -> Command { Command::cargo_bin("papermash").unwrap() }

// Helper to write an ICML snapshot into `dir`
fn write_icml_snapshot(dir: &Path) {
  let conn = rusqlite::Connection::open(dir.join("venues-icml-2025-v2.db")).unwrap();
  conn
    .execute_batch(
      r#"CREATE TABLE papers (id TEXT, title TEXT, raw_authors TEXT, pdf_url TEXT, accept_type TEXT, status TEXT);
         INSERT INTO papers VALUES ('icml-1', 'Scaling Sparse Attention', '[{"name": "Ada Lovelace"}]', NULL, 'oral', 'accepted');
         INSERT INTO papers VALUES ('icml-2', 'A Rejected Idea', '[]', NULL, NULL, 'rejected');
         INSERT INTO papers VALUES ('icml-3', 'Kernel Methods Return', '[{"name": "Alan Turing"}]', NULL, 'poster', 'accepted');
         INSERT INTO papers VALUES ('icml-4', 'Unlabelled Row', '[]', NULL, NULL, NULL);"#,
    )
    .unwrap();
}

#[test]
#[serial]
fn test_accepted_lists_papers() {
  let dir = tempdir().unwrap();
  write_icml_snapshot(dir.path());

  papermash()
    .args(["accepted", "icml", "--data-dir"])
    .arg(dir.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Found 2 papers"))
    .stdout(predicate::str::contains("Scaling Sparse Attention"))
    .stdout(predicate::str::contains("Kernel Methods Return"))
    .stdout(predicate::str::contains("A Rejected Idea").not());
}

#[test]
#[serial]
fn test_accepted_respects_limit_as_json() {
  let dir = tempdir().unwrap();
  write_icml_snapshot(dir.path());

  let output = papermash()
    .args(["accepted", "ICML", "--limit", "1", "--json", "--data-dir"])
    .arg(dir.path())
    .output()
    .unwrap();
  assert!(output.status.success());

  let papers: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  let papers = papers.as_array().unwrap();
  assert_eq!(papers.len(), 1);
  assert_eq!(papers[0]["id"], "icml-1");
  assert_eq!(papers[0]["venue"], "ICML 2025");
  assert_eq!(papers[0]["authors"][0], "Ada Lovelace");
}

#[test]
#[serial]
fn test_stats_counts_statuses() {
  let dir = tempdir().unwrap();
  write_icml_snapshot(dir.path());

  let output = papermash()
    .args(["stats", "icml", "--json", "--data-dir"])
    .arg(dir.path())
    .output()
    .unwrap();
  assert!(output.status.success());

  let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(stats["accepted"], 2);
  assert_eq!(stats["rejected"], 1);
  assert_eq!(stats["unknown"], 1);
}

#[test]
#[serial]
fn test_invalid_conference_fails() {
  let dir = tempdir().unwrap();

  papermash()
    .args(["stats", "neurips", "--data-dir"])
    .arg(dir.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("Conference must be either 'icml' or 'iclr'"));
}

#[test]
#[serial]
fn test_missing_snapshot_fails() {
  let dir = tempdir().unwrap();

  papermash()
    .args(["accepted", "iclr", "--data-dir"])
    .arg(dir.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("Snapshot file not found"));
}

#[test]
#[serial]
fn test_all_skips_missing_snapshots() {
  let dir = tempdir().unwrap();
  write_icml_snapshot(dir.path());

  papermash()
    .args(["all", "--data-dir"])
    .arg(dir.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Found 2 papers"));
}

#[test]
#[serial]
fn test_all_with_no_snapshots_is_empty() {
  let dir = tempdir().unwrap();

  papermash()
    .args(["all", "--json", "--data-dir"])
    .arg(dir.path())
    .assert()
    .success()
    .stdout(predicate::str::diff("[]\n"));
}
