//! CLI behavior tests: exit codes, output formats, split loading, config.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

const REPORT: &str = "tests/fixtures/v2/output.json";
const FIXTURES: &str = "tests/fixtures/v2";

fn logview_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_logview"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn stdout_json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let s = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(s.trim()).expect("valid JSON")
}

/// Copy the v2 fixtures into a fresh directory
fn fixture_dir(files: &[&str]) -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    for file in files {
        fs::copy(Path::new(FIXTURES).join(file), dir.path().join(file)).unwrap();
    }
    dir
}

#[test]
fn no_args_returns_error_not_panic() {
    logview_cmd()
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("REPORT"));
}

#[test]
fn summary_output() {
    logview_cmd()
        .arg(REPORT)
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("Test Report: Shop"))
        .stdout(predicate::str::contains("Statistics by Tag"))
        .stdout(predicate::str::contains("Checkout"))
        .stdout(predicate::str::contains("1 execution error(s)"));
}

#[test]
fn no_color_output_has_no_escapes() {
    logview_cmd()
        .arg(REPORT)
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("\u{1b}[").not());
}

#[test]
fn json_output_valid() {
    let value = stdout_json(logview_cmd().arg(REPORT).arg("--json"));
    assert_eq!(value["version"], 2);
    assert_eq!(value["suite"]["name"], "Shop");
    assert_eq!(value["suite"]["status"], "FAIL");
    assert_eq!(value["suite"]["suites"].as_array().unwrap().len(), 2);
    assert_eq!(value["statistics"]["tag"].as_array().unwrap().len(), 3);
    assert_eq!(value["errors"][0]["link"], "s1-s1-t1-k2");
}

#[test]
fn tag_search() {
    let value = stdout_json(logview_cmd().arg(REPORT).args(["--tag", "smoke", "--json"]));
    let names: Vec<&str> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["Pay With Card", "List Items"]);

    logview_cmd()
        .arg(REPORT)
        .args(["--tag", "payment", "--name", "*cash", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Tests tagged payment named *cash (1)"))
        .stdout(predicate::str::contains("Shop.Checkout.Pay With Cash"));
}

#[test]
fn path_loads_split_files() {
    logview_cmd()
        .arg(REPORT)
        .args(["--path", "s1-s1-t1-k1-k1", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Path: s1 > s1-s1 > s1-s1-t1 > s1-s1-t1-k1 > s1-s1-t1-k1-k1",
        ))
        .stdout(predicate::str::contains("Type Digits"))
        .stdout(predicate::str::contains("typed"))
        .stdout(predicate::str::contains("debug chatter").not());
}

#[test]
fn path_json_includes_loaded_children() {
    let value = stdout_json(logview_cmd().arg(REPORT).args(["--path", "s1-s1-t1", "--json"]));
    assert_eq!(value["chain"].as_array().unwrap().len(), 3);
    assert_eq!(value["node"]["kind"], "test");
    let children = value["node"]["children"].as_array().unwrap();
    assert_eq!(children[0]["name"], "Enter Card");
    // nested split file loaded as well
    assert_eq!(children[0]["children"][0]["name"], "Type Digits");
}

#[test]
fn unknown_path_warns_and_shows_nearest() {
    logview_cmd()
        .arg(REPORT)
        .args(["--path", "s1-s2-t9", "--no-color"])
        .assert()
        .success()
        .stderr(predicate::str::contains("s1-s2-t9 not found"))
        .stdout(predicate::str::contains("SUITE Shop.Browse"));
}

#[test]
fn errors_listing() {
    logview_cmd()
        .arg(REPORT)
        .args(["--errors", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Execution Errors (1)"))
        .stdout(predicate::str::contains("Deprecated keyword used"))
        .stdout(predicate::str::contains("-> s1-s1-t1-k2"));
}

#[test]
fn html_report_written() {
    let dir = tempfile::TempDir::new().unwrap();
    let html_path = dir.path().join("report.html");
    logview_cmd()
        .arg(REPORT)
        .arg("--no-color")
        .arg("--html")
        .arg(&html_path)
        .assert()
        .success();
    let html = fs::read_to_string(&html_path).unwrap();
    assert!(html.contains("<h1>Shop</h1>"));
    assert!(html.contains("id=\"statistics\""));
}

#[test]
fn missing_report_exit_2() {
    logview_cmd()
        .arg("nonexistent/output.json")
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Error"))
        .stderr(predicate::str::contains("nonexistent"));
}

#[test]
fn missing_split_file_exit_2() {
    let dir = fixture_dir(&["output.json"]);
    logview_cmd()
        .arg(dir.path().join("output.json"))
        .args(["--path", "s1-s1-t1-k1"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Failed to load split file"));
}

#[test]
fn config_combined_tags_and_min_level() {
    let dir = fixture_dir(&["output.json", "log-1.json", "log-2.json"]);
    fs::write(
        dir.path().join(".logviewrc.json"),
        r#"{
            "minLevel": "DEBUG",
            "colors": false,
            "combinedTags": [{ "pattern": "payment NOT smoke", "name": "Cash only" }]
        }"#,
    )
    .unwrap();
    let report = dir.path().join("output.json");

    logview_cmd()
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("Cash only"))
        .stdout(predicate::str::contains("\u{1b}[").not());

    logview_cmd()
        .arg(&report)
        .args(["--path", "s1-s1-t1-k1-k1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("debug chatter"));

    let value = stdout_json(logview_cmd().arg(&report).arg("--json"));
    assert_eq!(value["combined"][0]["label"], "Cash only");
    assert_eq!(value["combined"][0]["combined"], "payment NOT smoke");
}

#[test]
fn split_dir_from_config() {
    let dir = fixture_dir(&["output.json"]);
    let parts = dir.path().join("parts");
    fs::create_dir(&parts).unwrap();
    for file in ["log-1.json", "log-2.json"] {
        fs::copy(Path::new(FIXTURES).join(file), parts.join(file)).unwrap();
    }
    fs::write(dir.path().join(".logviewrc.json"), r#"{ "splitDir": "parts" }"#).unwrap();

    logview_cmd()
        .arg(dir.path().join("output.json"))
        .args(["--path", "s1-s1-t1-k2", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Submit"))
        .stdout(predicate::str::contains("Card declined"));
}

#[test]
fn lettered_report_summary() {
    logview_cmd()
        .arg("tests/fixtures/v1/output.json")
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("Test Report: Legacy"))
        .stdout(predicate::str::contains("Invalid Login"));
}
