use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "earth2d-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

const EXE: &str = env!("CARGO_BIN_EXE_earth2d-tester");

#[test]
fn cli_writes_csv_report() {
    let output_path = temp_path("csv");
    let status = Command::new(EXE)
        .args([
            "--strategy", "rest,random", "--seeds", "1..3", "--max-steps", "25", "--report",
            "csv", "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(&output_path).expect("read output");
    std::fs::remove_file(&output_path).ok();
    assert!(content.starts_with("seed,strategy,outcome"));
    assert_eq!(content.lines().count(), 1 + 2 * 2);
}

#[test]
fn cli_records_and_verifies_replays() {
    let replay_dir = temp_path("replays");
    let status = Command::new(EXE)
        .args(["--strategy", "heuristic", "--seeds", "7", "--max-steps", "30", "--report", "json"])
        .arg("--replay-dir")
        .arg(&replay_dir)
        .output()
        .expect("run cli");
    assert!(status.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&status.stdout).expect("json report on stdout");
    assert_eq!(report["episodes"][0]["seed"], 7);

    let replay = replay_dir.join("heuristic-seed7.json");
    let verified = Command::new(EXE)
        .arg("--verify")
        .arg(&replay)
        .output()
        .expect("run verify");
    std::fs::remove_dir_all(&replay_dir).ok();
    assert!(verified.status.success());
    assert!(String::from_utf8_lossy(&verified.stdout).contains("Replay verified"));
}

#[test]
fn cli_rejects_unknown_config_keys() {
    let config_path = temp_path("config.json");
    std::fs::write(&config_path, r#"{"map": {"width": 40, "colour": "blue"}}"#).unwrap();
    let output = Command::new(EXE)
        .arg("--config")
        .arg(&config_path)
        .output()
        .expect("run cli");
    std::fs::remove_file(&config_path).ok();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to load config"));
}
