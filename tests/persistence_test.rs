#![cfg(feature = "storage-rocksdb")]

use assert_cmd::cargo_bin;
use std::process::Command;
use tempfile::tempdir;

fn run(db_path: &std::path::Path, extra: &[&str]) -> serde_json::Value {
    let mut cmd = Command::new(cargo_bin!("vpn-provision"));
    cmd.arg("tests/fixtures/happy.json")
        .arg("--timezone")
        .arg("America/New_York")
        .arg("--db-path")
        .arg(db_path)
        .args(extra);

    let output = cmd.output().expect("Failed to execute command");
    assert!(output.status.success());
    serde_json::from_slice(&output.stdout).expect("profile json")
}

#[test]
fn test_rocksdb_region_pick_persists() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");

    // 1. First run: the user picks a region explicitly
    let first = run(&db_path, &["--region", "eu-central"]);
    assert_eq!(first["region"], "eu-central");

    // 2. Second run: no pick, the stored preference applies
    let second = run(&db_path, &[]);
    assert_eq!(second["region"], "eu-central");

    // 3. Picking "automatic" goes back to the timezone-derived region
    let third = run(&db_path, &["--region", "automatic"]);
    assert_eq!(third["region"], "us-east");
    let fourth = run(&db_path, &[]);
    assert_eq!(fourth["region"], "us-east");
}
