use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const PROJECT_CATALOG: &str = r#"
[[types]]
id = "5b8f1a57-2b3e-4a8f-9f4f-0c6a1d2e3f40"
name = "regression"
parent = "bug"
icon = "fa fa-history"

[types.fields."found_in"]
label = "Found in"
required = true
type = { kind = "string" }

[[link_types]]
id = "c3c2b9de-54c0-4c44-9a9f-2b7f0f3f5a61"
name = "Regressed by"
source = "regression"
target = "planneritem"
forward_name = "regressed by"
reverse_name = "regressed"
topology = "dependency"
category = "system"
"#;

/// Run `wt` inside `dir` with an isolated user config directory.
fn wt(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("wt"));
    cmd.current_dir(dir)
        .env("WITYPE_LOG", "error")
        .env("XDG_CONFIG_HOME", dir.join(".config"))
        .env("HOME", dir)
        .env("FORMAT", "text");
    cmd
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().expect("run wt");
    assert!(
        output.status.success(),
        "wt failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("stdout is JSON")
}

fn project_with_catalog(catalog: &str) -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    fs::create_dir_all(dir.path().join(".witype")).expect("create .witype");
    fs::write(
        dir.path().join(".witype/config.toml"),
        "[catalog]\npath = \"catalog.toml\"\n",
    )
    .expect("write config");
    fs::write(dir.path().join("catalog.toml"), catalog).expect("write catalog");
    dir
}

#[test]
fn types_lists_system_catalog_in_tree_order() {
    let dir = TempDir::new().expect("temp dir");
    let rows = json_stdout(wt(dir.path()).args(["types", "--json"]));
    let rows = rows.as_array().expect("array");
    assert_eq!(rows.len(), 8);
    assert_eq!(rows[0]["name"], "planneritem");
    assert!(rows[1..].iter().all(|r| r["parent"] == "planneritem"));
}

#[test]
fn is_a_answers_containment() {
    let dir = TempDir::new().expect("temp dir");
    wt(dir.path())
        .args(["is-a", "bug", "planneritem"])
        .assert()
        .success()
        .stdout("true\n");
    wt(dir.path())
        .args(["is-a", "bug", "feature"])
        .assert()
        .success()
        .stdout("false\n");
    wt(dir.path())
        .args(["is-a", "planneritem", "bug"])
        .assert()
        .success()
        .stdout("false\n");
    wt(dir.path())
        .args(["is-a", "bug", "bug"])
        .assert()
        .success()
        .stdout("true\n");
}

#[test]
fn unknown_type_reports_error_code() {
    let dir = TempDir::new().expect("temp dir");
    wt(dir.path())
        .args(["show", "epic", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E3001"))
        .stderr(predicate::str::contains("epic"));
}

#[test]
fn show_emits_the_type_document() {
    let dir = TempDir::new().expect("temp dir");
    let doc = json_stdout(wt(dir.path()).args(["show", "bug", "--json"]));
    assert_eq!(doc["data"]["type"], "workitemtypes");
    assert_eq!(doc["data"]["id"], "26787039-b68f-4e28-8814-c2f93be1ef4e");
    assert_eq!(
        doc["data"]["attributes"]["path"],
        "86af5178_9b41_469b_9096_57e5155c3f31.26787039_b68f_4e28_8814_c2f93be1ef4e"
    );
    assert_eq!(doc["meta"]["ancestors"][0], "planneritem");
}

#[test]
fn project_catalog_from_config_extends_hierarchy() {
    let dir = project_with_catalog(PROJECT_CATALOG);
    wt(dir.path())
        .args(["is-a", "regression", "planneritem"])
        .assert()
        .success()
        .stdout("true\n");

    let rows = json_stdout(wt(dir.path()).args(["types", "--under", "bug", "--json"]));
    let names: Vec<&str> = rows
        .as_array()
        .expect("array")
        .iter()
        .map(|r| r["name"].as_str().expect("name"))
        .collect();
    assert_eq!(names, vec!["bug", "regression"]);
}

#[test]
fn no_system_flag_drops_the_system_catalog() {
    let dir = project_with_catalog(PROJECT_CATALOG);
    wt(dir.path())
        .args(["check", "--no-system"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"))
        .stderr(predicate::str::contains("parent"));
}

#[test]
fn check_reports_invalid_topology() {
    let dir = project_with_catalog(&PROJECT_CATALOG.replace("\"dependency\"", "\"ring\""));
    wt(dir.path())
        .args(["check", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("E2001"))
        .stderr(predicate::str::contains("topology"));
}

#[test]
fn check_summarizes_a_valid_catalog() {
    let dir = project_with_catalog(PROJECT_CATALOG);
    let report = json_stdout(wt(dir.path()).args(["check", "--json"]));
    assert_eq!(report["ok"], true);
    assert_eq!(report["types"], 9);
    assert_eq!(report["link_types"], 4);
    assert_eq!(report["max_depth"], 3);
}

#[test]
fn links_filter_by_topology() {
    let dir = TempDir::new().expect("temp dir");
    wt(dir.path())
        .args(["links", "--topology", "tree"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Parenting\ttree\t"));
    wt(dir.path())
        .args(["links", "--topology", "Tree"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("network|directed_network|dependency|tree"));
}

#[test]
fn sanitize_prints_the_path_segment() {
    let dir = TempDir::new().expect("temp dir");
    wt(dir.path())
        .args(["sanitize", "26787039-b68f-4e28-8814-c2f93be1ef4e"])
        .assert()
        .success()
        .stdout("26787039_b68f_4e28_8814_c2f93be1ef4e\n");
}
