//! Integration tests for health scoring of traces on disk

mod utils;

use ctxaudit::health::{score_session, score_trace, HealthStatus, HealthWeights};
use ctxaudit::loader::{load_dir, load_file};
use ctxaudit::session_index::select_session;
use tempfile::TempDir;
use utils::{write_index, TraceBuilder};

#[test]
fn test_healthy_session_scores_100() {
    let dir = TempDir::new().unwrap();
    let mut trace = TraceBuilder::new("ok");
    trace.start().call("Read", "success").call("Bash", "success").end();
    let path = trace.write_to(dir.path());

    let health = score_trace(&load_file(&path).unwrap(), &HealthWeights::default());
    assert_eq!(health.score, 100);
    assert_eq!(health.status, HealthStatus::Ok);
}

#[test]
fn test_errors_and_missing_end_lower_score() {
    let dir = TempDir::new().unwrap();
    let mut trace = TraceBuilder::new("rough");
    trace
        .start()
        .call("Bash", "error")
        .call("Bash", "success")
        .call("Bash", "success")
        .call("Bash", "success");
    let path = trace.write_to(dir.path());

    let health = score_trace(&load_file(&path).unwrap(), &HealthWeights::default());
    // error rate 0.25 * 40 = 10, Bash over 20% unreliable = 10, no end = 10
    assert_eq!(health.score, 70);
    assert_eq!(health.status, HealthStatus::Ok);
    assert_eq!(health.inputs.unreliable_tools, 1);
    assert!(!health.inputs.has_session_end);
}

#[test]
fn test_interrupted_calls_hit_pairing_penalty() {
    let dir = TempDir::new().unwrap();
    let mut trace = TraceBuilder::new("cut");
    trace.start().pre("Read").pre("Write").call("Bash", "success").end();
    let path = trace.write_to(dir.path());

    let health = score_trace(&load_file(&path).unwrap(), &HealthWeights::default());
    // 1 of 3 calls completed: (1 - 1/3) * 10 = 6.67
    assert_eq!(health.score, 93);
    assert_eq!(health.inputs.pre_tool_use, 3);
    assert_eq!(health.inputs.post_tool_use, 1);
}

#[test]
fn test_per_session_scores_are_independent() {
    let dir = TempDir::new().unwrap();
    let mut good = TraceBuilder::new("good");
    good.start().call("Read", "success").end();
    good.write_to(dir.path());
    let mut bad = TraceBuilder::new("bad");
    bad.call("Bash", "error").call("Bash", "error");
    bad.write_to(dir.path());

    let trace = load_dir(dir.path()).unwrap();
    let sessions = trace.sessions();
    let weights = HealthWeights::default();

    assert_eq!(score_session(&sessions["good"], &weights).score, 100);
    let bad_score = score_session(&sessions["bad"], &weights);
    // 40 + 10 + 10 + 10
    assert_eq!(bad_score.score, 30);
    assert_eq!(bad_score.status, HealthStatus::Alert);
}

#[test]
fn test_select_session_prefers_index_latest() {
    let dir = TempDir::new().unwrap();
    let mut first = TraceBuilder::new("first");
    first.start().end();
    first.write_to(dir.path());
    let mut second = TraceBuilder::new("second");
    second.start().end();
    second.write_to(dir.path());
    write_index(
        dir.path(),
        &[("first", "2025-02-01T00:00:00Z"), ("second", "2025-01-01T00:00:00Z")],
    );

    let selected = select_session(dir.path(), None).unwrap().expect("a session");
    assert_eq!(selected.session_id, "first");

    let explicit = select_session(dir.path(), Some("second")).unwrap().expect("a session");
    assert_eq!(explicit.path, dir.path().join("session_second.jsonl"));
}

#[test]
fn test_select_session_empty_dir() {
    let dir = TempDir::new().unwrap();
    assert!(select_session(dir.path(), None).unwrap().is_none());
}
