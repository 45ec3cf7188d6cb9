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

fn history_ids(store_path: &Path, config_path: &Path) -> Vec<u64> {
    let output = run(store_path, config_path, &["--json", "history"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value = serde_json::from_str(&stdout).expect("json output");
    parsed
        .as_array()
        .expect("array output")
        .iter()
        .map(|entry| entry["id"].as_u64().expect("id field"))
        .collect()
}

fn cleanup(store_path: &Path) {
    std::fs::remove_file(store_path).ok();
    std::fs::remove_file(store_path.with_extension("history.csv")).ok();
}

#[test]
fn repeated_views_keep_one_history_entry_in_recency_order() {
    let store_path = temp_path("history.csv");
    let config_path = temp_path("history-config.json");

    for name in ["first", "second", "third"] {
        assert!(run(&store_path, &config_path, &["add", "task", name])
            .status
            .success());
    }

    assert!(run(&store_path, &config_path, &["show", "1"]).status.success());
    assert!(run(&store_path, &config_path, &["show", "2"]).status.success());
    assert!(run(&store_path, &config_path, &["show", "1"]).status.success());

    assert_eq!(history_ids(&store_path, &config_path), vec![2, 1]);

    cleanup(&store_path);
}

#[test]
fn deleting_an_entity_evicts_it_from_history() {
    let store_path = temp_path("history-delete.csv");
    let config_path = temp_path("history-delete-config.json");

    assert!(run(&store_path, &config_path, &["add", "task", "first"])
        .status
        .success());
    assert!(run(&store_path, &config_path, &["add", "task", "second"])
        .status
        .success());
    assert!(run(&store_path, &config_path, &["show", "1"]).status.success());
    assert!(run(&store_path, &config_path, &["show", "2"]).status.success());

    assert!(run(&store_path, &config_path, &["delete", "1"]).status.success());
    assert_eq!(history_ids(&store_path, &config_path), vec![2]);

    cleanup(&store_path);
}

#[test]
fn deleting_an_epic_removes_its_subtasks_from_history() {
    let store_path = temp_path("history-epic.csv");
    let config_path = temp_path("history-epic-config.json");

    assert!(run(&store_path, &config_path, &["add", "epic", "Release"])
        .status
        .success());
    assert!(run(
        &store_path,
        &config_path,
        &["add", "subtask", "Draft", "--epic", "1"]
    )
    .status
    .success());
    assert!(run(&store_path, &config_path, &["add", "task", "chore"])
        .status
        .success());

    assert!(run(&store_path, &config_path, &["show", "2"]).status.success());
    assert!(run(&store_path, &config_path, &["show", "1"]).status.success());
    assert!(run(&store_path, &config_path, &["show", "3"]).status.success());

    assert!(run(&store_path, &config_path, &["delete", "1"]).status.success());
    assert_eq!(history_ids(&store_path, &config_path), vec![3]);

    cleanup(&store_path);
}

#[test]
fn showing_an_unknown_id_fails_and_records_nothing() {
    let store_path = temp_path("history-missing.csv");
    let config_path = temp_path("history-missing-config.json");

    assert!(run(&store_path, &config_path, &["add", "task", "only"])
        .status
        .success());

    let output = run(&store_path, &config_path, &["show", "42"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: not_found"));

    assert_eq!(history_ids(&store_path, &config_path), Vec::<u64>::new());

    cleanup(&store_path);
}
