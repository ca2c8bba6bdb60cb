//! End-to-end CLI tests for the paperharvest binaries.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

// ==================== paperharvest ====================

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_search_binary_help_displays_usage() {
    let mut cmd = Command::cargo_bin("paperharvest").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Search for scholarly documents"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_search_binary_version_displays_version() {
    let mut cmd = Command::cargo_bin("paperharvest").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("paperharvest"));
}

/// Test that running without the required arguments fails with usage help.
#[test]
fn test_search_binary_requires_keyword_and_driver() {
    let mut cmd = Command::cargo_bin("paperharvest").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--keyword"));
}

/// Test that invalid flags cause non-zero exit.
#[test]
fn test_search_binary_invalid_flag_returns_error() {
    let mut cmd = Command::cargo_bin("paperharvest").unwrap();
    cmd.arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

// ==================== publisher-worker ====================

/// Test that a single positional is rejected with usage help.
#[test]
fn test_worker_wrong_arity_exits_nonzero() {
    let mut cmd = Command::cargo_bin("publisher-worker").unwrap();
    cmd.arg("./pdf/north_sea_wrecks")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

/// Test that a third positional is rejected.
#[test]
fn test_worker_extra_positional_exits_nonzero() {
    let mut cmd = Command::cargo_bin("publisher-worker").unwrap();
    cmd.args(["./pdf/north_sea_wrecks", "springer_urls.csv", "stray"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

/// Test that a missing queue file is reported but exits 0.
#[test]
fn test_worker_missing_queue_file_exits_zero() {
    let temp_dir = TempDir::new().unwrap();
    let queue_file = temp_dir.path().join("springer_urls.csv");

    let mut cmd = Command::cargo_bin("publisher-worker").unwrap();
    cmd.arg(temp_dir.path().join("out"))
        .arg(&queue_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("queue file not found"));
}

/// Test that a queue file whose name matches no publisher needs --publisher.
#[test]
fn test_worker_uninferable_queue_name_exits_nonzero() {
    let temp_dir = TempDir::new().unwrap();
    let queue_file = temp_dir.path().join("stuff.csv");
    std::fs::write(&queue_file, "https://example.com/a.pdf\n").unwrap();

    let mut cmd = Command::cargo_bin("publisher-worker").unwrap();
    cmd.arg(temp_dir.path().join("out"))
        .arg(&queue_file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot infer the publisher"));
}

/// Test that an unknown --publisher slug is rejected with the known list.
#[test]
fn test_worker_unknown_publisher_slug_exits_nonzero() {
    let mut cmd = Command::cargo_bin("publisher-worker").unwrap();
    cmd.args([
        "./out",
        "stuff.csv",
        "--publisher",
        "elsevier",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("unknown publisher"));
}

/// Test a full worker run over a real queue file against a local server.
#[tokio::test(flavor = "multi_thread")]
async fn test_worker_downloads_queue_and_truncates_file() {
    let Some(mock_server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/survey.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(&b"%PDF e2e"[..]))
        .mount(&mock_server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let out_dir = temp_dir.path().join("out");
    let queue_file = temp_dir.path().join("springer_urls.csv");
    std::fs::write(&queue_file, format!("{}/survey.pdf\n", mock_server.uri())).unwrap();

    let out_dir_arg = out_dir.clone();
    let queue_file_arg = queue_file.clone();
    // assert_cmd blocks; run it off the runtime so wiremock can serve.
    tokio::task::spawn_blocking(move || {
        let mut cmd = Command::cargo_bin("publisher-worker").unwrap();
        cmd.arg(&out_dir_arg)
            .arg(&queue_file_arg)
            .arg("--fast")
            .assert()
            .success();
    })
    .await
    .unwrap();

    assert_eq!(std::fs::read(out_dir.join("survey.pdf")).unwrap(), b"%PDF e2e");
    assert!(
        std::fs::read_to_string(&queue_file).unwrap().is_empty(),
        "queue must be truncated after the batch"
    );
}

// ==================== extract-answers ====================

/// Test that --keyword is required.
#[test]
fn test_extract_requires_keyword() {
    let mut cmd = Command::cargo_bin("extract-answers").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--keyword"));
}

/// Test that --pdf and --all refuse to combine.
#[test]
fn test_extract_pdf_and_all_conflict() {
    let mut cmd = Command::cargo_bin("extract-answers").unwrap();
    cmd.args([
        "--keyword",
        "north sea wrecks",
        "--pdf",
        "survey.pdf",
        "--all",
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("cannot be used with"));
}

/// Test that listing mode prints the downloaded documents, sorted.
#[test]
fn test_extract_lists_documents_without_api_key() {
    let temp_dir = TempDir::new().unwrap();
    let keyword_dir = temp_dir.path().join("pdf").join("north_sea_wrecks");
    std::fs::create_dir_all(&keyword_dir).unwrap();
    std::fs::write(keyword_dir.join("beta.pdf"), b"%PDF").unwrap();
    std::fs::write(keyword_dir.join("alpha.pdf"), b"%PDF").unwrap();

    let mut cmd = Command::cargo_bin("extract-answers").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .args(["--keyword", "north sea wrecks", "--output-root"])
        .arg(temp_dir.path().join("pdf"))
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha.pdf\nbeta.pdf"));
}

/// Test that listing mode reports an empty keyword directory.
#[test]
fn test_extract_lists_nothing_for_unknown_keyword() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("extract-answers").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .args(["--keyword", "never searched", "--output-root"])
        .arg(temp_dir.path().join("pdf"))
        .assert()
        .success()
        .stdout(predicate::str::contains("No documents downloaded"));
}

/// Test that analyzing without OPENAI_API_KEY fails with a clear message.
#[test]
fn test_extract_processing_requires_api_key() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("extract-answers").unwrap();
    cmd.env_remove("OPENAI_API_KEY")
        .args(["--keyword", "north sea wrecks", "--pdf", "survey.pdf"])
        .arg("--output-root")
        .arg(temp_dir.path().join("pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("OPENAI_API_KEY"));
}
