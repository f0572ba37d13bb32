//! Integration tests for the schemadoc CLI
//!
//! These tests exercise full CLI workflows against a SQLite database written
//! into a temporary project directory. HOME points below the same directory
//! so no global configuration leaks in.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use pretty_assertions::assert_eq;
use rusqlite::Connection;
use tempfile::TempDir;

const SCHEMA: &str = "
    CREATE TABLE departments (
        department_id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE employees (
        employee_id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        department_id INTEGER REFERENCES departments(department_id)
    );
    CREATE INDEX emp_name_idx ON employees(name);
    CREATE VIEW staff AS SELECT name FROM employees;
";

/// Get a Command for the schemadoc binary, rooted in `project`
#[allow(deprecated)]
fn schemadoc(project: &Path) -> Command {
    let mut cmd = Command::cargo_bin("schemadoc").expect("Failed to find schemadoc binary");
    for var in ["SCHEMADOC_CONFIG", "SCHEMADOC_DATABASE", "SCHEMADOC_SNAPSHOT", "SCHEMADOC_PROJECT"] {
        cmd.env_remove(var);
    }
    cmd.env("HOME", project.join("home")).arg("--project").arg(project);
    cmd
}

/// Create a temporary project holding `hr.db`
fn setup_project() -> TempDir {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let conn = Connection::open(temp.path().join("hr.db")).expect("Failed to create database");
    conn.execute_batch(SCHEMA).expect("Failed to create schema");
    temp
}

fn read_json(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("Failed to read output");
    serde_json::from_str(&content).expect("Output is not JSON")
}

fn object_keys(document: &serde_json::Value) -> Vec<String> {
    document["objects"]
        .as_array()
        .expect("objects array")
        .iter()
        .map(|o| o["key"].as_str().unwrap_or_default().to_string())
        .collect()
}

// ============================================================================
// Build Tests
// ============================================================================

#[test]
fn test_build_writes_document() {
    let project = setup_project();

    schemadoc(project.path())
        .args(["--database", "hr.db", "build", "--strict"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Wrote"));

    let document = read_json(&project.path().join("schema-graph.json"));
    assert_eq!(document["schema_version"], "1.0");

    let keys = object_keys(&document);
    assert!(keys.contains(&"table.employees".to_string()));
    assert!(keys.contains(&"table.employees.column.name".to_string()));
    assert!(keys.contains(&"table.departments.column.name".to_string()));
    assert!(keys.contains(&"index.emp_name_idx".to_string()));
    assert!(keys.contains(&"view.staff".to_string()));

    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn test_build_to_stdout_and_report() {
    let project = setup_project();

    let output = schemadoc(project.path())
        .args(["--database", "hr.db", "-q", "build", "--stdout", "--compact"])
        .args(["--report", "report.json"])
        .output()
        .expect("Failed to run build");
    assert!(output.status.success());

    let document: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout is the document");
    assert!(object_keys(&document).contains(&"table.departments".to_string()));
    assert!(!project.path().join("schema-graph.json").exists());

    let report = read_json(&project.path().join("report.json"));
    assert!(report["shells_created"].as_u64().unwrap() > 0);
}

#[test]
fn test_build_without_source_fails() {
    let project = setup_project();

    schemadoc(project.path())
        .arg("build")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No catalog source configured"));
}

#[test]
fn test_build_missing_database_fails() {
    let project = setup_project();

    schemadoc(project.path())
        .args(["--database", "missing.db", "build"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing.db"));
}

// ============================================================================
// Query Tests
// ============================================================================

#[test]
fn test_stats_json() {
    let project = setup_project();

    let output = schemadoc(project.path())
        .args(["--database", "hr.db", "stats", "--json"])
        .output()
        .expect("Failed to run stats");
    assert!(output.status.success());

    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).expect("stats JSON");
    assert_eq!(stats["graph"]["by_kind"]["TABLE"], 2);
    assert_eq!(stats["graph"]["by_kind"]["VIEW"], 1);
    assert!(stats["report"]["specs"].as_array().unwrap().len() > 1);
}

#[test]
fn test_stats_human_readable() {
    let project = setup_project();

    schemadoc(project.path())
        .args(["--database", "hr.db", "stats", "--queries"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Graph Statistics"))
        .stdout(predicate::str::contains("TABLE: 2"))
        .stdout(predicate::str::contains("Failed queries: none"))
        .stdout(predicate::str::contains("unavailable"));
}

#[test]
fn test_show_table() {
    let project = setup_project();

    schemadoc(project.path())
        .args(["--database", "hr.db", "show", "table", "EMPLOYEES"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TABLE employees"))
        .stdout(predicate::str::contains("Link: table-employees.html"))
        .stdout(predicate::str::contains("Children:"))
        .stdout(predicate::str::contains("INDEX emp_name_idx"));
}

#[test]
fn test_show_column_under_parent() {
    let project = setup_project();

    let output = schemadoc(project.path())
        .args(["--database", "hr.db", "show", "column", "name"])
        .args(["--parent", "table:departments", "--json"])
        .output()
        .expect("Failed to run show");
    assert!(output.status.success());

    let column: serde_json::Value = serde_json::from_slice(&output.stdout).expect("object JSON");
    assert_eq!(column["key"], "table.departments.column.name");
    assert_eq!(column["parent"], "table.departments");
    assert_eq!(column["link"], "table-departments.html#col-name");
    assert_eq!(column["attached"], true);
}

#[test]
fn test_show_unknown_object_fails() {
    let project = setup_project();

    schemadoc(project.path())
        .args(["--database", "hr.db", "show", "table", "payroll"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No TABLE named 'payroll'"));
}

// ============================================================================
// Snapshot Tests
// ============================================================================

#[test]
fn test_snapshot_replays_same_graph() {
    let project = setup_project();

    schemadoc(project.path())
        .args(["--database", "hr.db", "snapshot", "-o", "catalog.json"])
        .assert()
        .success();
    assert!(project.path().join("catalog.json").exists());

    schemadoc(project.path())
        .args(["--database", "hr.db", "build", "-o"])
        .arg(project.path().join("live.json"))
        .assert()
        .success();
    schemadoc(project.path())
        .args(["--snapshot", "catalog.json", "build", "-o"])
        .arg(project.path().join("replayed.json"))
        .assert()
        .success();

    assert_eq!(
        read_json(&project.path().join("replayed.json")),
        read_json(&project.path().join("live.json"))
    );
}

#[test]
fn test_snapshot_requires_database() {
    let project = setup_project();

    schemadoc(project.path())
        .args(["--snapshot", "catalog.json", "snapshot"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--database"));
}

// ============================================================================
// Catalog Tests
// ============================================================================

#[test]
fn test_catalog_check_builtin() {
    let project = setup_project();

    schemadoc(project.path())
        .args(["--dialect", "oracle", "catalog", "check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Catalog OK"))
        .stdout(predicate::str::contains("PROCEDURE"));
}

#[test]
fn test_catalog_show_round_trips_through_check() {
    let project = setup_project();

    let output = schemadoc(project.path())
        .args(["catalog", "show"])
        .output()
        .expect("Failed to run catalog show");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("[[spec]]"));

    let path = project.path().join("custom.toml");
    std::fs::write(&path, &output.stdout).unwrap();

    schemadoc(project.path())
        .args(["catalog", "check"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Catalog OK"));
}

#[test]
fn test_catalog_check_invalid_file() {
    let project = setup_project();
    let path = project.path().join("broken.toml");
    std::fs::write(&path, "[[spec]]\nname = \"orphan\"\ntarget = \"column\"\nquery = \"SELECT 1\"\n")
        .unwrap();

    schemadoc(project.path())
        .args(["catalog", "check"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid catalog"));
}

// ============================================================================
// Config Tests
// ============================================================================

#[test]
fn test_config_init_set_get() {
    let project = setup_project();

    schemadoc(project.path())
        .args(["config", "init"])
        .assert()
        .success();
    assert!(project.path().join(".schemadoc/config.toml").exists());

    schemadoc(project.path())
        .args(["config", "set", "source.database", "hr.db"])
        .assert()
        .success();
    schemadoc(project.path())
        .args(["config", "set", "build.wrap_width", "100"])
        .assert()
        .success();

    schemadoc(project.path())
        .args(["config", "get", "build.wrap_width"])
        .assert()
        .success()
        .stdout("100\n");

    // The configured database is used without --database
    schemadoc(project.path())
        .args(["-q", "build"])
        .assert()
        .success();
    assert!(project.path().join("schema-graph.json").exists());
}

#[test]
fn test_config_set_rejects_invalid_value() {
    let project = setup_project();

    schemadoc(project.path())
        .args(["config", "set", "build.wrap_width", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("wrap_width"));
}

#[test]
fn test_explicit_config_file() {
    let project = setup_project();
    let path = project.path().join("schemadoc.toml");
    std::fs::write(
        &path,
        "[source]\ndatabase = \"hr.db\"\n\n[output]\npath = \"out/graph.json\"\n",
    )
    .unwrap();

    schemadoc(project.path())
        .arg("--config")
        .arg(&path)
        .args(["-q", "build"])
        .assert()
        .success();
    assert!(project.path().join("out/graph.json").exists());
}
