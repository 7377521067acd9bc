//! End-to-end CLI tests for the recorder binary.

mod support;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::MockServer;

/// Command with the user config directory pointed somewhere empty.
fn recorder(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("recorder").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    recorder(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Scrape every result page"))
        .stdout(predicate::str::contains("--start-date"));
}

#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    recorder(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("recorder"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    recorder(&home)
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_binary_missing_dates_exits_with_failure_code() {
    let home = TempDir::new().unwrap();
    recorder(&home)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("date range is required"));
}

#[test]
fn test_binary_rejects_out_of_range_attempts() {
    let home = TempDir::new().unwrap();
    recorder(&home)
        .args(["--start-date", "07/01/2025", "--end-date", "10/21/2025", "-r", "0"])
        .assert()
        .failure();
}

#[test]
fn test_binary_bad_config_file_exits_with_failure_code() {
    let home = TempDir::new().unwrap();
    let config = home.path().join("broken.toml");
    std::fs::write(&config, "max_attempts = lots\n").unwrap();
    recorder(&home)
        .arg("--config")
        .arg(&config)
        .args(["--start-date", "07/01/2025", "--end-date", "10/21/2025"])
        .assert()
        .code(2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_full_run_writes_results() {
    let server = MockServer::start().await;
    support::mount_portal(&server, 2).await;
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let uri = server.uri();
    let out_dir = out.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        recorder(&home)
            .args(["--start-date", "07/01/2025", "--end-date", "10/21/2025"])
            .args(["--base-url", &uri])
            .args(["--step-delay", "0", "--page-delay", "0", "--no-progress"])
            .arg("-o")
            .arg(&out_dir)
            .assert()
    })
    .await
    .unwrap();
    assert.code(0);

    let raw = std::fs::read_to_string(out.path().join("pima_all_pages_complete.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["total_records"], 4);
    assert_eq!(json["status"], "complete");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_binary_partial_run_exits_with_partial_code() {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(support::SEARCH_RESULTS))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(404))
        .with_priority(1)
        .mount(&server)
        .await;
    support::mount_portal(&server, 2).await;
    let home = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let uri = server.uri();
    let out_dir = out.path().to_path_buf();

    let assert = tokio::task::spawn_blocking(move || {
        recorder(&home)
            .args(["--start-date", "07/01/2025", "--end-date", "10/21/2025"])
            .args(["--base-url", &uri])
            .args(["--step-delay", "0", "--page-delay", "0", "--no-progress"])
            .args(["--output-file", "run.json"])
            .arg("-o")
            .arg(&out_dir)
            .assert()
    })
    .await
    .unwrap();
    assert.code(1);

    let raw = std::fs::read_to_string(out.path().join("run.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(json["processing_stats"]["failed_pages"], serde_json::json!([1]));
    assert_eq!(json["total_records"], 2);
}
