//! CLI integration tests for every subcommand.
//!
//! Uses `assert_cmd` to spawn the `carapace` binary and verify
//! exit codes, stdout content, and stderr content.
//!
//! All tests set `current_dir` to the workspace root so that relative
//! paths to the shipped knowledge bundles resolve correctly.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Locate the workspace root by walking up from CARGO_MANIFEST_DIR.
fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    // crates/cli -> workspace root is two levels up
    manifest_dir
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .to_path_buf()
}

/// Helper: create a Command for the `carapace` binary, rooted at workspace.
fn carapace() -> Command {
    let mut cmd = cargo_bin_cmd!("carapace");
    cmd.current_dir(workspace_root());
    cmd
}

const PORCELLANIDAE: &str = "knowledge/porcellanidae.json";
const MUNIDA: &str = "knowledge/munida.json";
const ARMATUS_RECORD: &str = "knowledge/records/petrolisthes_armatus.json";
const SP_A_RECORD: &str = "knowledge/records/porcellana_sp_a.json";

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be JSON")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    carapace()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Carapace taxonomic identification toolkit",
        ));
}

#[test]
fn version_exits_0() {
    carapace()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("carapace"));
}

#[test]
fn unknown_subcommand_fails() {
    carapace().arg("frobnicate").assert().failure();
}

// ──────────────────────────────────────────────
// 2. identify
// ──────────────────────────────────────────────

#[test]
fn identify_text_lists_armatus_first() {
    carapace()
        .args(["identify", PORCELLANIDAE, "--record", ARMATUS_RECORD])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 candidate(s):"))
        .stdout(predicate::str::contains("1. Petrolisthes armatus  score 1.00"))
        .stdout(predicate::str::contains("2. Petrolisthes tridentatus  score 0.75"));
}

#[test]
fn identify_json_has_ranked_candidates() {
    let output = carapace()
        .args([
            "--output",
            "json",
            "identify",
            PORCELLANIDAE,
            "--record",
            ARMATUS_RECORD,
        ])
        .output()
        .expect("run carapace");
    assert!(output.status.success());

    let json = stdout_json(&output);
    let candidates = json["candidates"].as_array().expect("candidates array");
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0]["species"], "Petrolisthes armatus");
    assert_eq!(candidates[0]["matched_count"], 5);
    assert_eq!(candidates[0]["total_count"], 5);
    assert_eq!(candidates[1]["species"], "Petrolisthes tridentatus");
    assert!(candidates[0]["evidence"].is_object());
}

#[test]
fn identify_missing_record_exits_1() {
    carapace()
        .args(["identify", PORCELLANIDAE, "--record", "knowledge/records/nope.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("record file not found"));
}

#[test]
fn identify_rejects_non_object_record() {
    let dir = TempDir::new().unwrap();
    let record = dir.path().join("record.json");
    fs::write(&record, "[1, 2, 3]").unwrap();

    carapace()
        .args(["identify", PORCELLANIDAE, "--record"])
        .arg(&record)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("record must be a JSON object"));
}

#[test]
fn identify_json_error_is_structured() {
    carapace()
        .args([
            "--output",
            "json",
            "identify",
            "knowledge/missing.json",
            "--record",
            ARMATUS_RECORD,
        ])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("\"error\""));
}

// ──────────────────────────────────────────────
// 3. verify
// ──────────────────────────────────────────────

#[test]
fn verify_confirmed_exits_0() {
    carapace()
        .args([
            "verify",
            PORCELLANIDAE,
            "--record",
            SP_A_RECORD,
            "--species",
            "porcellana sp. a",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hypothesis CONFIRMED"))
        .stdout(predicate::str::contains("2 of 3 conditions satisfied"));
}

#[test]
fn verify_rejected_exits_2() {
    carapace()
        .args([
            "verify",
            PORCELLANIDAE,
            "--record",
            SP_A_RECORD,
            "--species",
            "Petrolisthes sp. B",
        ])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::contains("Hypothesis REJECTED"))
        .stdout(predicate::str::contains("3 missing"));
}

#[test]
fn verify_unknown_species_exits_2() {
    carapace()
        .args([
            "verify",
            PORCELLANIDAE,
            "--record",
            SP_A_RECORD,
            "--species",
            "Homo sapiens",
        ])
        .assert()
        .failure()
        .code(2)
        .stdout(predicate::str::contains("No rule is defined for \"Homo sapiens\""));
}

#[test]
fn verify_json_reports_counts() {
    let output = carapace()
        .args([
            "--output",
            "json",
            "verify",
            PORCELLANIDAE,
            "--record",
            SP_A_RECORD,
            "--species",
            "Porcellana sp. A",
        ])
        .output()
        .expect("run carapace");
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["found"], true);
    assert_eq!(json["verified"], true);
    assert_eq!(json["matched_count"], 2);
    assert_eq!(json["total_count"], 3);
    assert_eq!(json["missing_count"], 1);
    assert_eq!(json["rule_id"], "R_PORC_A");
}

// ──────────────────────────────────────────────
// 4. key
// ──────────────────────────────────────────────

#[test]
fn key_scripted_path_identifies_constricta() {
    carapace()
        .args(["key", MUNIDA, "--answers", "1,1,1,1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Identified: Munida constricta"))
        .stdout(predicate::str::contains("Confidence: 80.00%"));
}

#[test]
fn key_scripted_json_reports_terminal_state() {
    let output = carapace()
        .args(["--output", "json", "key", MUNIDA, "--answers", "1,1,1,1"])
        .output()
        .expect("run carapace");
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["state"]["status"], "terminal");
    assert_eq!(json["state"]["species_id"], "22");
    assert_eq!(json["steps_taken"], 4);
    assert_eq!(json["identification"]["name"], "Munida constricta");
    assert_eq!(json["identification"]["score"], 3);
    assert_eq!(json["ranked"].as_array().map(|r| r.len()), Some(3));
    assert_eq!(json["history"].as_array().map(|h| h.len()), Some(4));
    assert_eq!(json["history"][0]["answer"], "yes");
}

#[test]
fn key_partial_path_shows_next_question() {
    let output = carapace()
        .args(["--output", "json", "key", MUNIDA, "--answers", "2"])
        .output()
        .expect("run carapace");
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["state"]["status"], "active");
    assert_eq!(json["state"]["node_id"], "6");
    assert_eq!(json["prompt"]["options"][0]["number"], 1);
    assert!(json["identification"].is_null());
}

#[test]
fn key_out_of_range_answer_exits_1() {
    carapace()
        .args(["key", MUNIDA, "--answers", "1,7"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("answer 2 (7)"));
}

#[test]
fn key_zero_answer_exits_1() {
    carapace()
        .args(["key", MUNIDA, "--answers", "0"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("option numbers start at 1"));
}

#[test]
fn key_on_bundle_without_key_exits_1() {
    carapace()
        .args(["key", PORCELLANIDAE, "--answers", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("defines no dichotomous key"));
}

#[test]
fn key_interactive_shell_walks_back_and_quits() {
    carapace()
        .args(["key", MUNIDA])
        .write_stdin("1\n1\nback\nhistory\nranking\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Carapace key: Munida and Munidopsis"))
        .stdout(predicate::str::contains("carapace> "))
        .stdout(predicate::str::contains("[2]"))
        .stdout(predicate::str::contains("Candidates:"));
}

#[test]
fn key_interactive_shell_rejects_unknown_command() {
    carapace()
        .args(["key", MUNIDA])
        .write_stdin("sideways\nquit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown command: sideways"));
}

#[test]
fn key_interactive_shell_ends_on_eof() {
    carapace()
        .args(["key", MUNIDA])
        .write_stdin("1\n")
        .assert()
        .success();
}

// ──────────────────────────────────────────────
// 5. match
// ──────────────────────────────────────────────

#[test]
fn match_text_ranks_species() {
    carapace()
        .args([
            "match",
            PORCELLANIDAE,
            "--features",
            "rugoso, delgada",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Petrolisthes armatus"));
}

#[test]
fn match_json_echoes_parsed_features() {
    let output = carapace()
        .args([
            "--output",
            "json",
            "match",
            PORCELLANIDAE,
            "--features",
            "rugoso, no observado",
        ])
        .output()
        .expect("run carapace");
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["features"], serde_json::json!(["rugoso"]));
    assert!(json["matches"].is_array());
}

#[test]
fn match_with_no_hits_says_so() {
    carapace()
        .args(["match", PORCELLANIDAE, "--features", "xyzzy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No species matches"));
}

// ──────────────────────────────────────────────
// 6. validate
// ──────────────────────────────────────────────

#[test]
fn validate_shipped_bundles() {
    for bundle in [PORCELLANIDAE, MUNIDA] {
        carapace()
            .args(["validate", bundle])
            .assert()
            .success()
            .stdout(predicate::str::contains("valid"));
    }
}

#[test]
fn validate_json_success() {
    carapace()
        .args(["--output", "json", "validate", MUNIDA])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"valid\": true"));
}

#[test]
fn validate_rejects_wrong_bundle_kind() {
    let dir = TempDir::new().unwrap();
    let bundle = dir.path().join("bad.json");
    fs::write(
        &bundle,
        r#"{"id": "bad", "kind": "Contract", "carapace": "1.0", "constructs": []}"#,
    )
    .unwrap();

    carapace()
        .arg("validate")
        .arg(&bundle)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid bundle"));
}

#[test]
fn validate_rejects_dangling_key_reference() {
    let dir = TempDir::new().unwrap();
    let bundle = dir.path().join("dangling.json");
    fs::write(
        &bundle,
        r#"{
          "id": "dangling",
          "kind": "Bundle",
          "carapace": "1.0",
          "constructs": [
            {"kind": "Key", "id": "k", "root": "1"},
            {"kind": "KeyNode", "id": "1", "question": "Q?",
             "options": [{"label": "YES", "next": "2"}, {"label": "NO", "species": "s"}]}
          ]
        }"#,
    )
    .unwrap();

    let output = carapace()
        .args(["--output", "json", "validate"])
        .arg(&bundle)
        .output()
        .expect("run carapace");
    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value =
        serde_json::from_slice(&output.stderr).expect("stderr should be JSON");
    assert_eq!(json["valid"], false);
    assert!(!json["errors"].as_array().unwrap().is_empty());
}

#[test]
fn validate_invalid_json_exits_1() {
    let dir = TempDir::new().unwrap();
    let bundle = dir.path().join("broken.json");
    fs::write(&bundle, "{ not json").unwrap();

    carapace()
        .arg("validate")
        .arg(&bundle)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("invalid JSON"));
}

// ──────────────────────────────────────────────
// 7. Configuration and quiet mode
// ──────────────────────────────────────────────

#[test]
fn config_lowers_leaf_floor() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("carapace.toml");
    fs::write(&config, "[key]\nleaf_floor = 50\ntop_n = 1\n").unwrap();

    let output = carapace()
        .args(["--output", "json", "--config"])
        .arg(&config)
        .args(["key", MUNIDA, "--answers", "1,1,1,1"])
        .output()
        .expect("run carapace");
    assert!(output.status.success());

    let json = stdout_json(&output);
    assert_eq!(json["identification"]["confidence"], 75.0);
    assert_eq!(json["ranked"].as_array().map(|r| r.len()), Some(1));
}

#[test]
fn example_config_is_accepted() {
    carapace()
        .args(["--config", "docs/carapace.example.toml"])
        .args(["match", PORCELLANIDAE, "--features", "rugoso, delgada"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1. Petrolisthes armatus"));
}

#[test]
fn config_with_unknown_key_exits_1() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("carapace.toml");
    fs::write(&config, "[key]\nfloor = 50\n").unwrap();

    carapace()
        .arg("--config")
        .arg(&config)
        .args(["key", MUNIDA, "--answers", "1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error: config"));
}

#[test]
fn missing_explicit_config_exits_1() {
    carapace()
        .args(["--config", "no/such/carapace.toml"])
        .args(["match", PORCELLANIDAE, "--features", "rugoso"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn quiet_suppresses_output() {
    carapace()
        .args([
            "--quiet",
            "identify",
            PORCELLANIDAE,
            "--record",
            ARMATUS_RECORD,
        ])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn verbose_logs_to_stderr() {
    carapace()
        .args(["--verbose", "identify", PORCELLANIDAE, "--record", ARMATUS_RECORD])
        .assert()
        .success()
        .stderr(predicate::str::contains("bundle loaded"));
}
