//! CLI integration tests
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("assay");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

#[test]
fn test_cli_extract_file() {
    cmd()
        .args(["extract", &get_fixture_path("product_page.html")])
        .assert()
        .success()
        .stdout(predicate::str::contains("SAML"))
        .stdout(predicate::str::contains("product_name: Larkspur Notes"));
}

#[test]
fn test_cli_extract_json() {
    let output = cmd()
        .args(["extract", "-f", "json", &get_fixture_path("product_page.html")])
        .output()
        .unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["metadata"]["price"], "12.00");
    assert_eq!(json["strategy"], "primary");
    assert!(json["error"].is_null());
}

#[test]
fn test_cli_extract_stdin() {
    let html = std::fs::read_to_string(get_fixture_path("plain_page.html")).unwrap();
    cmd()
        .args(["extract", "-"])
        .write_stdin(html)
        .assert()
        .success()
        .stdout(predicate::str::contains("url: stdin"))
        .stdout(predicate::str::contains("boils a full litre"));
}

#[test]
fn test_cli_output_file() {
    let tmp = TempDir::new().unwrap();
    let output = tmp.path().join("extract.txt");

    cmd()
        .args(["extract", "-o", output.to_str().unwrap()])
        .arg(get_fixture_path("product_page.html"))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(&output).unwrap();
    assert!(written.contains("Larkspur"));
}

#[test]
fn test_cli_insufficient_content() {
    cmd()
        .args(["extract", &get_fixture_path("thin_page.html")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient content"));
}

#[test]
fn test_cli_invalid_file() {
    cmd().args(["extract", "nonexistent.html"]).assert().failure();
}

#[test]
fn test_cli_criteria_list() {
    cmd()
        .arg("criteria")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usability (usability, weight 3)"))
        .stdout(predicate::str::contains("Scalability"));
}

#[test]
fn test_cli_criteria_json() {
    let output = cmd().args(["criteria", "--format", "json"]).output().unwrap();

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json.as_array().map(Vec::len), Some(8));
    assert_eq!(json[0]["id"], "usability");
}

#[test]
fn test_cli_evaluate_requires_api_key() {
    cmd()
        .env_remove("GOOGLE_API_KEY")
        .args(["evaluate", "https://example.com/product"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("GOOGLE_API_KEY"));
}

#[test]
fn test_cli_evaluate_invalid_url() {
    cmd()
        .env("GOOGLE_API_KEY", "test-key")
        .args(["evaluate", "not a url"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to evaluate product"));
}

#[test]
fn test_cli_evaluate_bad_criteria_file() {
    cmd()
        .env("GOOGLE_API_KEY", "test-key")
        .args(["evaluate", "https://example.com/product", "--criteria", "missing.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.json"));
}

#[test]
fn test_cli_verbose() {
    cmd()
        .args(["extract", "-v", &get_fixture_path("product_page.html")])
        .assert()
        .success()
        .stderr(predicate::str::contains("Assay"))
        .stderr(predicate::str::contains("Extraction Details"));
}
