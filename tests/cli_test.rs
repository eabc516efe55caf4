use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!("vpn-provision"));
    cmd.arg("tests/fixtures/happy.json")
        .arg("--timezone")
        .arg("America/New_York");

    let output = cmd.output()?;
    assert!(output.status.success());

    let profile: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(profile["region"], "us-east");
    assert_eq!(profile["hostname"], "host-2.vpn.example");
    assert_eq!(profile["display-name"], "Host Two");
    assert_eq!(profile["client-public-key"], "fixture-public-key");
    assert_eq!(profile["credentials"]["mapped-ipv4-address"], "10.64.0.2");

    Ok(())
}

#[test]
fn test_cli_region_override() {
    let mut cmd = Command::new(cargo_bin!("vpn-provision"));
    cmd.arg("tests/fixtures/happy.json")
        .arg("--timezone")
        .arg("America/New_York")
        .arg("--region")
        .arg("eu-central");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""region": "eu-central""#));
}

#[test]
fn test_cli_unmatched_timezone() {
    let mut cmd = Command::new(cargo_bin!("vpn-provision"));
    cmd.arg("tests/fixtures/happy.json")
        .arg("--timezone")
        .arg("Pacific/Noop");

    cmd.assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "VPN profile creation failed\nCouldn't get matching timezone for : Pacific/Noop",
        ));
}

#[test]
fn test_cli_rejected_purchase() {
    let mut cmd = Command::new(cargo_bin!("vpn-provision"));
    cmd.arg("tests/fixtures/rejected.json")
        .arg("--timezone")
        .arg("America/New_York");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains(
            "Purchase token verification failed\nFailed to verify purchase token.",
        ));
}

#[test]
fn test_cli_missing_scenario_file() {
    let mut cmd = Command::new(cargo_bin!("vpn-provision"));
    cmd.arg("tests/fixtures/does-not-exist.json");

    cmd.assert().failure();
}
