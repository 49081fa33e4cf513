//! Scenario: `rackcorp config-hash` over layered YAML files.
//!
//! GREEN when:
//! - The hash is stable for the same inputs and changes when a later layer
//!   overrides a value.
//! - A literal secret in config is refused with `CONFIG_SECRET_DETECTED`.

use std::fs;
use std::path::Path;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

fn write(dir: &Path, name: &str, body: &str) -> String {
    let p = dir.join(name);
    fs::write(&p, body).unwrap();
    p.to_string_lossy().to_string()
}

fn hash_of(args: &[&str], cwd: &Path) -> String {
    let out = Command::cargo_bin("rackcorp")
        .unwrap()
        .current_dir(cwd)
        .arg("config-hash")
        .args(args)
        .output()
        .unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8(out.stdout).unwrap();
    stdout
        .lines()
        .find_map(|l| l.strip_prefix("config_hash="))
        .unwrap()
        .to_string()
}

#[test]
fn scenario_config_hash_is_stable_and_layer_sensitive() {
    let dir = tempfile::tempdir().unwrap();
    let base = write(
        dir.path(),
        "base.yaml",
        "rackcorp:\n  http_timeout_secs: 30\nwaits:\n  timeout_secs: 3600\n",
    );
    let fast = write(dir.path(), "fast.yaml", "waits:\n  timeout_secs: 60\n");

    let h1 = hash_of(&[&base], dir.path());
    let h2 = hash_of(&[&base], dir.path());
    let layered = hash_of(&[&base, &fast], dir.path());

    assert_eq!(h1, h2);
    assert_eq!(h1.len(), 64);
    assert_ne!(h1, layered);
}

#[test]
fn scenario_config_hash_prints_merged_canonical_json() {
    let dir = tempfile::tempdir().unwrap();
    let base = write(dir.path(), "base.yaml", "waits:\n  delay_secs: 10\n  timeout_secs: 3600\n");
    let over = write(dir.path(), "over.yaml", "waits:\n  timeout_secs: 60\n");

    Command::cargo_bin("rackcorp")
        .unwrap()
        .current_dir(dir.path())
        .args(["config-hash", &base, &over])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#"{"waits":{"delay_secs":10,"timeout_secs":60}}"#));
}

#[test]
fn scenario_config_hash_refuses_secret_literal() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write(
        dir.path(),
        "bad.yaml",
        "rackcorp:\n  keys_env:\n    api_secret: \"hunter2-not-an-env-name\"\n",
    );

    Command::cargo_bin("rackcorp")
        .unwrap()
        .current_dir(dir.path())
        .args(["config-hash", &bad])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
}

#[test]
fn scenario_config_hash_requires_a_path() {
    Command::cargo_bin("rackcorp")
        .unwrap()
        .arg("config-hash")
        .assert()
        .failure();
}
