// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end CLI exercise: `corsair keygen`, `corsair sign`, `corsair
//! verify`, run as real subprocesses against a temp key directory and a
//! self-contained evidence file.

use assert_cmd::Command;
use predicates::prelude::*;

const EVIDENCE: &str = r#"{
  "source": "generic",
  "metadata": {
    "title": "Q3 Internal Review",
    "issuer": "Acme Platform Team",
    "date": "2026-06-01",
    "scope": "prod AWS account"
  },
  "controls": [
    {
      "id": "c1",
      "description": "Access reviews were independently tested and demonstrated quarterly.",
      "status": "effective",
      "severity": "HIGH",
      "evidence": "Screenshots and audit logs attached."
    }
  ]
}"#;

fn bin() -> Command {
    Command::cargo_bin("corsair").unwrap()
}

#[test]
fn keygen_then_sign_then_verify_round_trips_and_accepts() {
    let key_dir = tempfile::tempdir().unwrap();
    let evidence_file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(evidence_file.path(), EVIDENCE).unwrap();
    let cpoe_file = tempfile::NamedTempFile::new().unwrap();

    bin()
        .args(["keygen", "--output"])
        .arg(key_dir.path())
        .assert()
        .success();

    bin()
        .args(["sign", "--evidence"])
        .arg(evidence_file.path())
        .args(["--issuer", "issuer.example.com", "--issuer-name", "Acme Corp", "--key-dir"])
        .arg(key_dir.path())
        .args(["--output"])
        .arg(cpoe_file.path())
        .assert()
        .success();

    let signed = std::fs::read_to_string(cpoe_file.path()).unwrap();
    assert_eq!(signed.trim().split('.').count(), 3);

    bin()
        .args(["verify", "--file"])
        .arg(cpoe_file.path())
        .args(["--pubkey"])
        .arg(key_dir.path().join("ed25519.pub"))
        .assert()
        .success()
        .stdout(predicate::str::contains("verdict:     accepted"));
}

#[test]
fn verify_rejects_a_cpoe_signed_by_a_different_key() {
    let key_dir = tempfile::tempdir().unwrap();
    let other_key_dir = tempfile::tempdir().unwrap();
    let evidence_file = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(evidence_file.path(), EVIDENCE).unwrap();
    let cpoe_file = tempfile::NamedTempFile::new().unwrap();

    bin().args(["keygen", "--output"]).arg(other_key_dir.path()).assert().success();

    bin()
        .args(["sign", "--evidence"])
        .arg(evidence_file.path())
        .args(["--issuer", "issuer.example.com", "--issuer-name", "Acme Corp", "--key-dir"])
        .arg(key_dir.path())
        .args(["--output"])
        .arg(cpoe_file.path())
        .assert()
        .success();

    bin()
        .args(["verify", "--file"])
        .arg(cpoe_file.path())
        .args(["--pubkey"])
        .arg(other_key_dir.path().join("ed25519.pub"))
        .assert()
        .failure();
}
