use predicates::prelude::*;

fn fixture() -> String {
    format!("{}/tests/fixtures/listings.json", env!("CARGO_MANIFEST_DIR"))
}

#[test]
fn query_file_filters_and_sorts() {
    let mut cmd = assert_cmd::Command::cargo_bin("autolist").unwrap();
    cmd.args(["query", "--file", &fixture(), "--price-max", "20000", "--sort", "price_desc"])
        .assert()
        .success()
        .stdout(predicate::str::contains("3 results | page 1 of 1"))
        .stdout(predicate::str::contains("1. 2019 Toyota Camry SE · $17,900"))
        .stdout(predicate::str::contains("3. 2017 Ford Focus SEL · $9,900"));
}

#[test]
fn query_file_json_output_hides_internal_source() {
    let mut cmd = assert_cmd::Command::cargo_bin("autolist").unwrap();
    let output = cmd
        .args(["query", "--file", &fixture(), "--q", "mx-5", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let page: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["page_size"], 12);
    assert_eq!(page["items"][0]["source"], "");
    assert_eq!(page["items"][0]["source_hidden"], true);
    assert_eq!(page["items"][0]["status"], "SOLD");
}

#[test]
fn query_file_rejects_page_zero() {
    let mut cmd = assert_cmd::Command::cargo_bin("autolist").unwrap();
    cmd.args(["query", "--file", &fixture(), "--page", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Page numbers start at 1"));
}

#[test]
fn query_missing_file_reports_path() {
    let mut cmd = assert_cmd::Command::cargo_bin("autolist").unwrap();
    cmd.args(["query", "--file", "does-not-exist.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does-not-exist.json"));
}
