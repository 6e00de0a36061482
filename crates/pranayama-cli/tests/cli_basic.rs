//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::path::Path;
use std::process::Command;

/// Run a CLI command and return (stdout, stderr, exit code).
fn run_cli(data_dir: &Path, args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_pranayama"))
        .args(args)
        .env("PRANAYAMA_DATA_DIR", data_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

/// Run a CLI command, expect success, and parse stdout as JSON.
fn run_json(data_dir: &Path, args: &[&str]) -> serde_json::Value {
    let (stdout, stderr, code) = run_cli(data_dir, args);
    assert_eq!(code, 0, "{args:?} failed: {stderr}");
    serde_json::from_str(&stdout).expect("Failed to parse JSON output")
}

#[test]
fn test_pattern_resolve_default_tier() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_json(dir.path(), &["pattern", "resolve"]);
    assert_eq!(out["label"], "Adhama (8-16-8-10)");
    assert_eq!(out["durations"]["Hold"], 16);
    assert_eq!(out["cycle_secs"], 42);
    assert_eq!(out["nostril_active"], false);
}

#[test]
fn test_pattern_resolve_nadi() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_json(dir.path(), &["pattern", "resolve", "--tier", "medium", "--nadi"]);
    assert_eq!(out["nostril_active"], true);
    assert_eq!(out["label"], "NADI SHODHANA (4:4:8)");
    assert_eq!(out["durations"]["Relax"], 0);
}

#[test]
fn test_custom_refuses_nadi_with_note() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, stderr, code) = run_cli(
        dir.path(),
        &["pattern", "resolve", "--custom", "5", "10", "5", "0", "--nadi"],
    );
    assert_eq!(code, 0);
    assert!(stderr.contains("Nadi Shodhana is disabled"), "stderr: {stderr}");
    let out: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(out["label"], "Custom (5-10-5)");
    assert_eq!(out["nostril_active"], false);
}

#[test]
fn test_custom_without_values_uses_config() {
    let dir = tempfile::tempdir().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["config", "set", "custom.relax", "0"]);
    assert_eq!(code, 0);
    let out = run_json(dir.path(), &["pattern", "resolve", "--custom"]);
    assert_eq!(out["label"], "Custom (8-16-8)");
    assert_eq!(out["cycle_secs"], 32);
}

#[test]
fn test_pattern_tiers() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_json(dir.path(), &["pattern", "tiers"]);
    let tiers = out.as_array().unwrap();
    assert_eq!(tiers.len(), 3);
    assert_eq!(tiers[2]["name"], "Uttama");
}

#[test]
fn test_session_simulate_counts_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let out = run_json(
        dir.path(),
        &["session", "simulate", "--tier", "medium", "--seconds", "80", "--step", "0.5"],
    );
    assert_eq!(out["state"]["cycle_count"], 1);
    assert_eq!(out["state"]["phase"], "inhale");
    assert_eq!(out["transitions"], 4);
    assert_eq!(out["record"]["cycles"], 1);
    assert_eq!(out["record"]["duration"], 80);
}

#[test]
fn test_session_simulate_record_goes_to_history() {
    let dir = tempfile::tempdir().unwrap();
    run_json(
        dir.path(),
        &["session", "simulate", "--seconds", "84", "--step", "1", "--record"],
    );
    let stats = run_json(dir.path(), &["history", "stats"]);
    assert_eq!(stats["sessions"], 1);
    assert_eq!(stats["total_cycles"], 2);

    // Without --record nothing is stored.
    run_json(dir.path(), &["session", "simulate", "--seconds", "42"]);
    let history = run_json(dir.path(), &["history", "list"]);
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[test]
fn test_session_simulate_rejects_bad_step() {
    let dir = tempfile::tempdir().unwrap();
    let (_, stderr, code) = run_cli(
        dir.path(),
        &["session", "simulate", "--seconds", "10", "--step", "0"],
    );
    assert_ne!(code, 0);
    assert!(stderr.contains("--step"));
}

#[test]
fn test_preset_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    run_json(dir.path(), &["preset", "save", "Box", "4", "4", "4", "4"]);

    let (_, stderr, code) = run_cli(dir.path(), &["preset", "save", "Box", "5", "5", "5", "5"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("already exists"));

    let saved = run_json(
        dir.path(),
        &["preset", "save", "Box", "5", "5", "5", "5", "--overwrite"],
    );
    assert_eq!(saved["Inhale"], 5);

    let out = run_json(dir.path(), &["pattern", "resolve", "--preset", "Box"]);
    assert_eq!(out["label"], "Box (5-5-5)");

    let list = run_json(dir.path(), &["preset", "list"]);
    assert_eq!(list.as_array().unwrap().len(), 1);

    let (_, _, code) = run_cli(dir.path(), &["preset", "delete", "Box"]);
    assert_eq!(code, 0);
    let (_, _, code) = run_cli(dir.path(), &["preset", "show", "Box"]);
    assert_ne!(code, 0);
}

#[test]
fn test_config_get_set() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["config", "get", "session.tier"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "easy");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "session.tier", "hard"]);
    assert_eq!(code, 0);
    let out = run_json(dir.path(), &["pattern", "resolve"]);
    assert_eq!(out["label"], "Uttama (16-64-32-10)");

    let (_, _, code) = run_cli(dir.path(), &["config", "set", "session.bogus", "1"]);
    assert_ne!(code, 0);
}

#[test]
fn test_history_export_import() {
    let dir = tempfile::tempdir().unwrap();
    run_json(
        dir.path(),
        &["session", "simulate", "--seconds", "42", "--record"],
    );
    run_json(dir.path(), &["preset", "save", "Calm", "4", "0", "6", "2"]);

    let backup = dir.path().join("backup.json");
    let backup_arg = backup.to_str().unwrap();
    let (_, _, code) = run_cli(dir.path(), &["history", "export", backup_arg]);
    assert_eq!(code, 0);

    let (_, _, code) = run_cli(dir.path(), &["history", "clear"]);
    assert_eq!(code, 0);
    assert_eq!(run_json(dir.path(), &["history", "stats"])["sessions"], 0);

    let (_, _, code) = run_cli(dir.path(), &["history", "import", backup_arg]);
    assert_eq!(code, 0);
    assert_eq!(run_json(dir.path(), &["history", "stats"])["sessions"], 1);
    assert_eq!(
        run_json(dir.path(), &["preset", "list"]).as_array().unwrap().len(),
        1
    );
}

#[test]
fn test_noise_render_and_stats() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("rain.f32");
    let (_, _, code) = run_cli(
        dir.path(),
        &[
            "noise", "render", "--kind", "rain", "--seconds", "0.5", "--sample-rate", "8000",
            "--seed", "1", "--out", out.to_str().unwrap(),
        ],
    );
    assert_eq!(code, 0);
    assert_eq!(std::fs::metadata(&out).unwrap().len(), 4000 * 4);

    let stats = run_json(
        dir.path(),
        &["noise", "stats", "--kind", "pink", "--samples", "20000", "--seed", "3"],
    );
    assert_eq!(stats["kind"], "pink");
    assert!(stats["peak"].as_f64().unwrap() <= 1.0);
}

#[test]
fn test_completions() {
    let dir = tempfile::tempdir().unwrap();
    let (stdout, _, code) = run_cli(dir.path(), &["completions", "bash"]);
    assert_eq!(code, 0);
    assert!(stdout.contains("pranayama"));
}
