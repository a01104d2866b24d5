//! File-level tests: loading documents, exporting, decisions and reports

use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use um_core::{
    parse_document, ClassificationReport, DecisionFile, Error, MergeConfig, Session, Side,
    DEFAULT_OUTPUT_FILE,
};

fn write(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn fixture(dir: &Path) -> (PathBuf, PathBuf) {
    let left = write(
        dir,
        "bot-a.json",
        &json!({
            "utterances": [
                {"condition": "greet", "text": "Hello", "id": "a1", "flows": ["main"]},
                {"condition": "bye", "text": "Bye"},
                {"condition": "help", "text": "How can I help?"}
            ],
            "trains": [{"name": "t1"}]
        }),
    );
    let right = write(
        dir,
        "bot-b.json",
        &json!({
            "utterances": [
                {"condition": "greet", "text": "Hello", "id": "b7", "parent": "root"},
                {"condition": "bye", "text": "Goodbye"},
                {"condition": "thanks", "text": "Thanks!"}
            ],
            "trains": [{"name": "t1"}, {"name": "t2"}]
        }),
    );
    (left, right)
}

#[test]
fn test_export_writes_sorted_pretty_json() {
    let dir = TempDir::new().unwrap();
    let (left, right) = fixture(dir.path());

    let mut session = Session::default();
    session.load_file(Side::Left, &left).unwrap();
    session.load_file(Side::Right, &right).unwrap();

    let summary = session.partition().unwrap().summary();
    assert_eq!(summary.identical, 1);
    assert_eq!(summary.conflicts, 1);
    assert_eq!(summary.left_only, 1);
    assert_eq!(summary.right_only, 1);

    let out = dir.path().join(DEFAULT_OUTPUT_FILE);
    assert!(matches!(
        session.export_to(&out),
        Err(Error::UnresolvedConflicts { .. })
    ));
    assert!(!out.exists());

    session.resolve("bye", Side::Right).unwrap();
    session.export_to(&out).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("{\n  \"utterances\": ["));

    let merged = parse_document(&out).unwrap();
    let keys: Vec<&str> = merged.utterances.iter().map(|r| r.condition()).collect();
    assert_eq!(keys, vec!["bye", "greet", "help", "thanks"]);
    assert_eq!(merged.utterances[0].get("text"), Some(&json!("Goodbye")));
    // identical records keep the left version, volatile fields included
    assert_eq!(merged.utterances[1].get("id"), Some(&json!("a1")));
    assert_eq!(merged.trains, vec![json!({"name": "t1"}), json!({"name": "t2"})]);
}

#[test]
fn test_missing_file_is_read_error() {
    let dir = TempDir::new().unwrap();
    let mut session = Session::default();

    let err = session
        .load_file(Side::Left, dir.path().join("nope.json"))
        .unwrap_err();

    assert!(matches!(err, Error::FileRead { .. }));
    assert!(session.document(Side::Left).is_none());
}

#[test]
fn test_decisions_roundtrip_through_file() {
    let dir = TempDir::new().unwrap();
    let (left, right) = fixture(dir.path());

    let mut session = Session::default();
    session.load_file(Side::Left, &left).unwrap();
    session.load_file(Side::Right, &right).unwrap();
    session.resolve("bye", Side::Left).unwrap();
    session.toggle("help").unwrap();

    let decisions_path = dir.path().join("decisions.json");
    session.decisions().unwrap().save(&decisions_path).unwrap();

    let mut replay = Session::default();
    replay.load_file(Side::Left, &left).unwrap();
    replay.load_file(Side::Right, &right).unwrap();
    let outcome = replay
        .apply_decisions(&DecisionFile::load(&decisions_path).unwrap())
        .unwrap();

    assert_eq!(outcome.resolutions_applied, 1);
    assert_eq!(outcome.exclusions_applied, 1);
    assert_eq!(replay.export().unwrap(), session.export().unwrap());
}

#[test]
fn test_report_files() {
    let dir = TempDir::new().unwrap();
    let (left, right) = fixture(dir.path());

    let mut session = Session::default();
    session.load_file(Side::Left, &left).unwrap();
    session.load_file(Side::Right, &right).unwrap();

    let report = ClassificationReport::from_session(&session).unwrap();
    let csv_path = dir.path().join("report.csv");
    let json_path = dir.path().join("report.json");
    report.write_csv(&csv_path).unwrap();
    report.write_json(&json_path).unwrap();

    let csv = fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 5);
    assert!(csv.contains("bye,conflict,pending_resolution,"));

    let json: Value = serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
    assert_eq!(json["left"], "bot-a.json");
    assert_eq!(json["rows"].as_array().unwrap().len(), 4);
}

#[test]
fn test_config_file_switches_equality() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("config.json");
    fs::write(&config_path, r#"{"equality": "textual", "volatile_fields": ["id"]}"#).unwrap();
    let config = MergeConfig::load(&config_path).unwrap();

    let mut session = Session::new(config);
    session
        .load(
            Side::Left,
            "l.json",
            r#"{"utterances":[{"condition":"k","a":1,"b":2,"flows":["x"]}]}"#,
        )
        .unwrap();
    session
        .load(
            Side::Right,
            "r.json",
            r#"{"utterances":[{"condition":"k","b":2,"a":1,"flows":["x"]}]}"#,
        )
        .unwrap();

    // key order differs, so the textual comparison reports a conflict
    assert_eq!(session.partition().unwrap().summary().conflicts, 1);
}
