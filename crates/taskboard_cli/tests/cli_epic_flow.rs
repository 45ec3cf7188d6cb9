use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_path(file_name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("taskboard-{nanos}-{file_name}"))
}

fn run(store_path: &Path, config_path: &Path, args: &[&str]) -> std::process::Output {
    let exe = env!("CARGO_BIN_EXE_taskboard");
    Command::new(exe)
        .args(args)
        .env("TASKBOARD_STORE_PATH", store_path)
        .env("TASKBOARD_CONFIG_PATH", config_path)
        .output()
        .expect("failed to run taskboard")
}

fn cleanup(store_path: &Path) {
    std::fs::remove_file(store_path).ok();
    std::fs::remove_file(store_path.with_extension("history.csv")).ok();
}

fn epic_status(store_path: &Path, config_path: &Path) -> String {
    let output = run(store_path, config_path, &["--json", "list", "epics"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    parsed[0]["status"].as_str().expect("status field").to_string()
}

#[test]
fn epic_status_follows_its_subtasks_across_invocations() {
    let store_path = temp_path("epic-flow.csv");
    let config_path = temp_path("epic-flow-config.json");

    assert!(run(&store_path, &config_path, &["add", "epic", "Release"])
        .status
        .success());
    assert!(run(
        &store_path,
        &config_path,
        &["add", "subtask", "Draft notes", "--epic", "1"]
    )
    .status
    .success());
    assert!(run(
        &store_path,
        &config_path,
        &["add", "subtask", "Publish notes", "--epic", "1"]
    )
    .status
    .success());

    assert_eq!(epic_status(&store_path, &config_path), "NEW");

    assert!(run(&store_path, &config_path, &["status", "2", "in-progress"])
        .status
        .success());
    assert_eq!(epic_status(&store_path, &config_path), "IN_PROGRESS");

    assert!(run(&store_path, &config_path, &["status", "2", "done"])
        .status
        .success());
    // The second subtask is still NEW, so the mix keeps the epic in progress.
    assert_eq!(epic_status(&store_path, &config_path), "IN_PROGRESS");

    assert!(run(&store_path, &config_path, &["status", "3", "done"])
        .status
        .success());
    assert_eq!(epic_status(&store_path, &config_path), "DONE");

    cleanup(&store_path);
}

#[test]
fn epic_time_window_is_derived_and_persisted() {
    let store_path = temp_path("epic-window.csv");
    let config_path = temp_path("epic-window-config.json");

    assert!(run(&store_path, &config_path, &["add", "epic", "Release"])
        .status
        .success());
    assert!(run(
        &store_path,
        &config_path,
        &[
            "add",
            "subtask",
            "Draft",
            "--epic",
            "1",
            "--start",
            "2025-01-01T10:00:00Z",
            "--duration",
            "30"
        ]
    )
    .status
    .success());
    assert!(run(
        &store_path,
        &config_path,
        &[
            "add",
            "subtask",
            "Publish",
            "--epic",
            "1",
            "--start",
            "2025-01-01T12:00:00Z",
            "--duration",
            "45"
        ]
    )
    .status
    .success());

    let output = run(&store_path, &config_path, &["--json", "list", "epics"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    assert_eq!(parsed[0]["startTime"], "2025-01-01T10:00:00Z");
    assert_eq!(parsed[0]["duration"], 75);

    cleanup(&store_path);
}

#[test]
fn subtasks_of_an_unknown_epic_fail() {
    let store_path = temp_path("no-epic.csv");
    let config_path = temp_path("no-epic-config.json");

    let output = run(&store_path, &config_path, &["subtasks", "42"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: not_found"));
}

#[test]
fn setting_an_epics_status_directly_is_rejected() {
    let store_path = temp_path("epic-status.csv");
    let config_path = temp_path("epic-status-config.json");

    assert!(run(&store_path, &config_path, &["add", "epic", "Release"])
        .status
        .success());

    let output = run(&store_path, &config_path, &["status", "1", "done"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));

    cleanup(&store_path);
}
