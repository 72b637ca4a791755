//! Integration tests for the JSON-lines check log

use watchdog::Verdict;
use watchdog::sinks::CheckLog;
use watchdog_server::{CheckRecord, JsonlCheckLog};

fn read_records(path: &std::path::Path) -> Vec<CheckRecord> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

#[tokio::test]
async fn test_appends_one_line_per_check() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checks.jsonl");
    let log = JsonlCheckLog::new(&path);

    log.log_check("Icecast Sources", Verdict::Pass).await.unwrap();
    log.log_check("Liquidsoap CPU", Verdict::Fail).await.unwrap();

    let records = read_records(&path);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].flag_name, "Icecast Sources");
    assert_eq!(records[0].status, Verdict::Pass);
    assert_eq!(records[1].flag_name, "Liquidsoap CPU");
    assert_eq!(records[1].status, Verdict::Fail);
    assert!(records[0].timestamp <= records[1].timestamp);
}

#[tokio::test]
async fn test_existing_history_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checks.jsonl");

    JsonlCheckLog::new(&path)
        .log_check("TS File Count", Verdict::Pass)
        .await
        .unwrap();
    // A fresh sink on the same file must append, not truncate
    JsonlCheckLog::new(&path)
        .log_check("HLS Old Files", Verdict::Pass)
        .await
        .unwrap();

    assert_eq!(read_records(&path).len(), 2);
}

#[tokio::test]
async fn test_record_wire_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("checks.jsonl");
    JsonlCheckLog::new(&path)
        .log_check("HLS Old Files", Verdict::Fail)
        .await
        .unwrap();

    let line = std::fs::read_to_string(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(json["flag_name"], "HLS Old Files");
    assert_eq!(json["status"], "fail");
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_unwritable_path_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let log = JsonlCheckLog::new(dir.path().join("missing").join("checks.jsonl"));

    let err = log.log_check("Icecast Sources", Verdict::Pass).await.unwrap_err();
    assert!(matches!(err, common::Error::CheckLog(_)));
}
