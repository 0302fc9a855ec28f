//! End-to-end tests for the estatefeed binary

mod common;

use assert_cmd::Command;
use common::*;
use predicates::prelude::*;
use serde_json::json;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn estatefeed() -> Command {
    let mut cmd = Command::cargo_bin("estatefeed").unwrap();
    for var in [
        "ESTATEFEED_API_TOKEN",
        "ESTATEFEED_BASE_ID",
        "ESTATEFEED_TABLE",
        "ESTATEFEED_API_URL",
        "ESTATEFEED_BATCH_SIZE",
        "ESTATEFEED_PROVISION_COLUMNS",
        "ESTATEFEED_SCRATCH_DIR",
        "ESTATEFEED_LOG_LEVEL",
        "ESTATEFEED_LOG_OUTPUT",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

#[test]
fn test_inspect_prints_json_lines() {
    let ws = Workspace::with_entries(&[
        ("modern.xml", MODERN_FEED.as_bytes()),
        ("nested/export.xml", UNKNOWN_LAYOUT_FEED.as_bytes()),
    ]);

    let output = estatefeed()
        .arg("inspect")
        .arg(&ws.archive)
        .arg("--scratch-dir")
        .arg(&ws.scratch_root)
        .assert()
        .success()
        .stderr(predicate::str::contains("4 listing(s) from 2 feed file(s)"))
        .get_output()
        .stdout
        .clone();

    let lines: Vec<serde_json::Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|l| l["address"].is_string() && l["estate_type"].is_string()));
    assert_eq!(ws.scratch_leftovers(), 0);
}

#[test]
fn test_inspect_missing_archive_fails() {
    let dir = tempfile::tempdir().unwrap();

    estatefeed()
        .arg("inspect")
        .arg(dir.path().join("missing.zip"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input"));
}

#[test]
fn test_import_rejects_short_token() {
    let ws = Workspace::with_entries(&[("modern.xml", MODERN_FEED.as_bytes())]);

    estatefeed()
        .args(["import", "--token", "short", "--base-id", BASE_ID, "--table", TABLE])
        .arg(&ws.archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("access token is too short"));
}

#[test]
fn test_import_requires_destination() {
    let ws = Workspace::with_entries(&[("modern.xml", MODERN_FEED.as_bytes())]);

    estatefeed()
        .arg("import")
        .arg(&ws.archive)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--token"));
}

#[tokio::test]
async fn test_import_against_mock_destination() {
    let server = MockServer::start().await;
    let columns: Vec<serde_json::Value> = all_columns().iter().map(|name| json!({ "name": name })).collect();
    Mock::given(method("GET"))
        .and(path("/v0/meta/bases/appTestBase/tables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [{ "id": "tblListings", "name": TABLE, "fields": columns }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v0/appTestBase/Listings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{ "id": "rec1" }, { "id": "rec2" }, { "id": "rec3" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ws = Workspace::with_entries(&[("modern.xml", MODERN_FEED.as_bytes())]);

    estatefeed()
        .arg("import")
        .arg(&ws.archive)
        .args(["--token", TOKEN, "--base-id", BASE_ID, "--table", TABLE])
        .arg("--api-url")
        .arg(server.uri())
        .arg("--scratch-dir")
        .arg(&ws.scratch_root)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 3 of 3 listings from 1 feed file(s)"));

    assert_eq!(ws.scratch_leftovers(), 0);
}

#[tokio::test]
async fn test_import_with_failed_rows_exits_nonzero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/meta/bases/appTestBase/tables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [{ "id": "tblListings", "name": TABLE, "fields": [] }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v0/appTestBase/Listings"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({ "error": "INVALID_REQUEST_UNKNOWN" })))
        .mount(&server)
        .await;

    let ws = Workspace::with_entries(&[("modern.xml", MODERN_FEED.as_bytes())]);

    estatefeed()
        .arg("import")
        .arg(&ws.archive)
        .args(["--token", TOKEN, "--base-id", BASE_ID, "--table", TABLE])
        .arg("--api-url")
        .arg(server.uri())
        .arg("--scratch-dir")
        .arg(&ws.scratch_root)
        .assert()
        .failure()
        .stdout(predicate::str::contains("0 created, 3 failed"))
        .stderr(predicate::str::contains("missing"));
}

async fn mount_schema_without(server: &MockServer, missing: &str) {
    let columns: Vec<serde_json::Value> = columns_without(&[missing])
        .iter()
        .map(|name| json!({ "name": name }))
        .collect();
    Mock::given(method("GET"))
        .and(path("/v0/meta/bases/appTestBase/tables"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tables": [{ "id": "tblListings", "name": TABLE, "fields": columns }]
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v0/appTestBase/Listings"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{ "id": "rec1" }, { "id": "rec2" }, { "id": "rec3" }]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_provisioning_enabled_by_truthy_env_values() {
    for value in ["1", "yes", "true", "on"] {
        let server = MockServer::start().await;
        mount_schema_without(&server, "Heating").await;
        Mock::given(method("POST"))
            .and(path("/v0/meta/bases/appTestBase/tables/tblListings/fields"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "fldHeating", "name": "Heating" })))
            .expect(1)
            .mount(&server)
            .await;

        let ws = Workspace::with_entries(&[("modern.xml", MODERN_FEED.as_bytes())]);

        estatefeed()
            .env("ESTATEFEED_PROVISION_COLUMNS", value)
            .arg("import")
            .arg(&ws.archive)
            .args(["--token", TOKEN, "--base-id", BASE_ID, "--table", TABLE])
            .arg("--api-url")
            .arg(server.uri())
            .arg("--scratch-dir")
            .arg(&ws.scratch_root)
            .assert()
            .success()
            .stdout(predicate::str::contains("Imported 3 of 3 listings").and(predicate::str::contains("basic").not()));
    }
}

#[tokio::test]
async fn test_provisioning_disabled_by_falsey_env_values() {
    for value in ["0", "no", "false", "off"] {
        let server = MockServer::start().await;
        mount_schema_without(&server, "Heating").await;
        Mock::given(method("POST"))
            .and(path("/v0/meta/bases/appTestBase/tables/tblListings/fields"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let ws = Workspace::with_entries(&[("modern.xml", MODERN_FEED.as_bytes())]);

        estatefeed()
            .env("ESTATEFEED_PROVISION_COLUMNS", value)
            .arg("import")
            .arg(&ws.archive)
            .args(["--token", TOKEN, "--base-id", BASE_ID, "--table", TABLE])
            .arg("--api-url")
            .arg(server.uri())
            .arg("--scratch-dir")
            .arg(&ws.scratch_root)
            .assert()
            .success()
            .stdout(predicate::str::contains("basic records"));
    }
}
