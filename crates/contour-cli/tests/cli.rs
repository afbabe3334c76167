use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const SHAPE: &str = r#"{
    "type": "and",
    "value": [
        { "type": "class", "value": "urn:Employee" },
        {
            "type": "field",
            "value": {
                "edge": { "property": "urn:title" },
                "shape": { "type": "minCount", "value": 1 }
            }
        },
        {
            "type": "field",
            "value": {
                "edge": { "property": "urn:salary" },
                "shape": { "type": "and", "value": [] }
            }
        }
    ]
}"#;

const DATA: &str = r#"[
    { "@id": "urn:e1", "@type": "urn:Employee", "urn:title": "Sales Rep", "urn:salary": 100 },
    { "@id": "urn:e2", "@type": "urn:Employee", "urn:title": "Sales Rep", "urn:salary": 200 },
    { "@id": "urn:e3", "@type": "urn:Employee", "urn:title": "President", "urn:salary": 500 }
]"#;

const INCOMPLETE: &str = r#"[
    { "@id": "urn:e4", "@type": "urn:Employee", "urn:salary": 300 }
]"#;

/// Workspace with isolated config and data directories
struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("shape.json"), SHAPE).unwrap();
        std::fs::write(dir.path().join("data.json"), DATA).unwrap();
        std::fs::write(dir.path().join("incomplete.json"), INCOMPLETE).unwrap();
        Self { dir }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("contour").unwrap();
        cmd.current_dir(self.dir.path());
        cmd.env("HOME", self.dir.path());
        cmd.env("CONTOUR_CONFIG", self.path("config.toml"));
        cmd.env("CONTOUR_DATA_DIR", self.path("store"));
        cmd.env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn help_flag() {
    Command::cargo_bin("contour")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("query"))
        .stdout(predicate::str::contains("compile"));
}

#[test]
fn optimize_prints_shape() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["-f", "json", "optimize", "--shape", "shape.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("urn:Employee"))
        .stdout(predicate::str::contains("minCount"));
}

#[test]
fn validate_passes_complete_data() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["validate", "--shape", "shape.json", "--data", "data.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No issues found"));
}

#[test]
fn validate_reports_missing_field() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["validate", "--shape", "shape.json", "--data", "incomplete.json"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("<urn:e4>"))
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn aliases_under_labelled_field() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.path("nested.json"),
        r#"{
            "type": "field",
            "value": {
                "edge": { "property": "urn:sells" },
                "shape": { "type": "meta", "value": { "key": "label", "value": { "literal": { "lexical": "Product" } } } }
            }
        }"#,
    )
    .unwrap();

    sandbox
        .cmd()
        .args(["aliases", "--shape", "nested.json", "--path", "urn:sells"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("Product\n"));
}

#[test]
fn query_items_from_document() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["query", "--data", "data.json", "items", "--shape", "shape.json", "--path", "urn:title"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sales Rep"))
        .stdout(predicate::str::contains("President"));
}

#[test]
fn query_edges_paged() {
    let sandbox = Sandbox::new();

    let output = sandbox
        .cmd()
        .args([
            "-f", "json", "query", "--data", "data.json", "edges", "--shape", "shape.json", "--order",
            "-urn:salary", "--limit", "1",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["type"], "edges");
    assert_eq!(json["resources"].as_array().unwrap().len(), 1);
    assert_eq!(json["resources"][0]["value"]["iri"], "urn:e3");
}

#[test]
fn compile_prints_sparql() {
    let sandbox = Sandbox::new();
    std::fs::write(
        sandbox.path("query.json"),
        r#"{ "type": "items", "shape": { "type": "class", "value": "urn:Employee" }, "path": [{ "property": "urn:title" }] }"#,
    )
    .unwrap();

    sandbox
        .cmd()
        .args(["compile", "query.json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("select"))
        .stdout(predicate::str::contains("<urn:title>"));
}

#[test]
fn import_then_query_store() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["import", "data.json", "--shape", "shape.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 9 statements"));

    assert!(sandbox.path("store").join("graph.json").exists());

    sandbox
        .cmd()
        .args(["query", "stats", "--shape", "shape.json", "--path", "urn:salary"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(total)"))
        .stdout(predicate::str::contains("500"));
}

#[test]
fn import_rejected_by_shape() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["import", "incomplete.json", "--shape", "shape.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Import rejected"));

    assert!(!sandbox.path("store").join("graph.json").exists());
}

#[test]
fn config_path_honours_env() {
    let sandbox = Sandbox::new();

    sandbox
        .cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    sandbox
        .cmd()
        .args(["config", "set", "items_limit", "5"])
        .assert()
        .success();

    sandbox
        .cmd()
        .args(["config", "get", "items_limit"])
        .assert()
        .success()
        .stdout(predicate::str::diff("5\n"));

    sandbox.cmd().args(["config", "unset", "items_limit"]).assert().success();

    sandbox
        .cmd()
        .args(["config", "get", "items_limit"])
        .assert()
        .success()
        .stdout(predicate::str::diff("0\n"));
}

#[test]
fn completions_bash() {
    Command::cargo_bin("contour")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("contour"));
}
