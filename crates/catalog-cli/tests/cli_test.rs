//! Command round trips against a temporary index store.

use std::fs;
use std::path::Path;

use clap::Parser;
use pretty_assertions::assert_eq;
use serde_json::Value;
use tempfile::TempDir;

use catalog_cli::{execute, open_service, run_offline, Cli};
use catalog_service::AssetService;
use catalog_types::Settings;

struct TestHarness {
    temp_dir: TempDir,
    service: AssetService,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let settings = Settings {
            index_path: temp_dir.path().join("index").to_string_lossy().into_owned(),
            writer_memory_mb: 15,
            ..Default::default()
        };
        let service = open_service(&settings).unwrap();
        Self { temp_dir, service }
    }

    fn write_file(&self, name: &str, contents: &str) -> String {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path.to_string_lossy().into_owned()
    }

    async fn run(&self, args: &[&str]) -> String {
        let cli = Cli::parse_from(std::iter::once("catalog").chain(args.iter().copied()));
        let mut out = Vec::new();
        execute(cli.command, &self.service, &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }
}

fn json_lines(output: &str) -> Vec<Value> {
    output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_ingest_search_export_flow() {
    let harness = TestHarness::new();

    // 1. Create indices
    let migrated = harness.run(&["migrate"]).await;
    assert_eq!(migrated.lines().filter(|l| l.starts_with("created")).count(), 4);

    // 2. Ingest three topics
    let file = harness.write_file(
        "topics.jsonl",
        concat!(
            r#"{"urn": "kafka::orders", "name": "orders", "service": "kafka", "data": {"country": "id"}}"#,
            "\n",
            r#"{"urn": "kafka::payments", "name": "payments", "service": "kafka", "data": {"country": "sg"}}"#,
            "\n",
            r#"{"urn": "kafka::refunds", "name": "refunds", "service": "kafka", "data": {"country": "id"}}"#,
            "\n",
        ),
    );
    let written = harness.run(&["ingest", "--type", "topic", &file]).await;
    assert_eq!(written.trim(), "3");

    // 3. Search finds the named topic first
    let hits = json_lines(&harness.run(&["search", "orders"]).await);
    assert_eq!(hits[0]["asset"]["urn"], "kafka::orders");
    assert_eq!(hits[0]["type"], "topic");

    // 4. Filtered export
    let exported = json_lines(
        &harness
            .run(&["export", "--type", "topic", "--filter", "data.country=id"])
            .await,
    );
    let mut urns: Vec<_> = exported
        .iter()
        .map(|a| a["urn"].as_str().unwrap().to_string())
        .collect();
    urns.sort();
    assert_eq!(urns, vec!["kafka::orders", "kafka::refunds"]);

    // 5. Counts reflect the ingest
    let counts = harness.run(&["counts"]).await;
    assert!(counts.lines().any(|l| l == "topic\t3"));

    // 6. Name completion and paging
    let suggested = harness.run(&["suggest", "pay"]).await;
    assert_eq!(suggested.trim(), "payments");

    let page = json_lines(
        &harness
            .run(&["list", "--type", "topic", "--from", "1", "--size", "1"])
            .await,
    );
    assert_eq!(page[0]["count"], 1);
    assert_eq!(page[0]["total"], 3);
    assert_eq!(page[0]["data"][0]["urn"], "kafka::payments");
}

#[tokio::test]
async fn test_put_update_get_delete() {
    let harness = TestHarness::new();
    harness.run(&["migrate"]).await;

    let asset = harness.write_file(
        "users.json",
        r#"{"urn": "pg::users", "type": "table", "name": "users", "service": "postgres"}"#,
    );
    let put = json_lines(&harness.run(&["put", &asset, "--by", "ada@example.com"]).await);
    assert_eq!(put[0]["version"], "0.1");

    let payload = harness.write_file("patch.json", r#"{"description": "registered users"}"#);
    let updated =
        json_lines(&harness.run(&["update", "--type", "table", "pg::users", &payload]).await);
    assert_eq!(updated[0]["version"], "0.2");
    assert_eq!(updated[0]["changelog"][0]["path"][0], "description");

    let fetched: Value =
        serde_json::from_str(&harness.run(&["get", "--type", "table", "pg::users"]).await).unwrap();
    assert_eq!(fetched["description"], "registered users");

    let deleted = harness.run(&["delete", "--type", "table", "pg::users"]).await;
    assert_eq!(deleted.trim(), "deleted\ttable\tpg::users");
}

fn offline(args: &[&str]) -> String {
    let cli = Cli::parse_from(std::iter::once("catalog").chain(args.iter().copied()));
    let mut out = Vec::new();
    run_offline(cli.command, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn write(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_diff_prints_changelog() {
    let dir = TempDir::new().unwrap();
    let old = write(dir.path(), "old.json", r#"{"urn": "u", "name": "a", "data": {"n": 1}}"#);
    let new = write(dir.path(), "new.json", r#"{"urn": "u", "name": "b", "data": {"n": 1}}"#);

    let changes = json_lines(&offline(&["diff", &old, &new]));

    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["path"], serde_json::json!(["name"]));
    assert_eq!(changes[0]["from"], "a");
    assert_eq!(changes[0]["to"], "b");
}

#[test]
fn test_patch_prints_patched_asset() {
    let dir = TempDir::new().unwrap();
    let asset = write(dir.path(), "asset.json", r#"{"urn": "u", "name": "a", "data": {"n": 1}}"#);
    let payload = write(dir.path(), "patch.json", r#"{"data": {"m": 2}}"#);

    let patched: Value = serde_json::from_str(&offline(&["patch", &asset, &payload])).unwrap();

    assert_eq!(patched["data"], serde_json::json!({"n": 1, "m": 2}));
    assert_eq!(patched["name"], "a");
}
