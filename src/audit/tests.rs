// Tests for the audit passes
//
// Scenarios mirror what live sessions produce: intermittent Bash failures,
// an interrupted Write, an Edit that keeps flip-flopping, sessions that were
// restarted after crashes and sloppy event writers.

use super::*;
use crate::event::{Event, EventType};
use crate::issue::{IssueKind, Severity};

fn post(session: &str, second: u32, tool: &str, status: &str) -> Event {
    Event::new(
        session,
        &format!("2025-01-01T10:{:02}:{:02}Z", second / 60, second % 60),
        EventType::PostToolUse,
    )
    .with_tool(tool)
    .with_status(status)
}

fn audit(events: Vec<Event>) -> AuditReport {
    let trace = TraceSet::from_events(events);
    run_audit(&trace, None, &AuditConfig::default())
}

fn only(passes: &[AuditPass]) -> AuditConfig {
    AuditConfig {
        passes: passes.to_vec(),
        ..AuditConfig::default()
    }
}

#[test]
fn test_bash_thirty_percent_is_critical() {
    let events = (0..10)
        .map(|i| post("s1", i, "Bash", if i % 3 == 1 && i < 9 { "error" } else { "success" }))
        .collect::<Vec<_>>();
    assert_eq!(events.iter().filter(|e| e.is_error()).count(), 3);

    let report = audit(events);
    let issue = report
        .issues_of_type("intermittent_tool_failure")
        .next()
        .expect("intermittent issue");
    assert_eq!(issue.severity, Severity::Critical);
    assert!(issue.message.contains("30.0%"));
    assert!(issue.message.contains("(3/10 calls)"));
    match &issue.kind {
        IssueKind::IntermittentToolFailure {
            tool,
            error_rate,
            success_count,
            error_count,
            sessions_affected,
        } => {
            assert_eq!(tool, "Bash");
            assert_eq!(*error_rate, 30.0);
            assert_eq!(*success_count, 7);
            assert_eq!(*error_count, 3);
            assert_eq!(*sessions_affected, 1);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn test_low_error_rate_is_warning() {
    let mut events: Vec<Event> = (0..10).map(|i| post("s1", i, "Grep", "success")).collect();
    events[4] = post("s1", 4, "Grep", "error");
    let report = audit(events);
    let issue = report.issues_of_type("intermittent_tool_failure").next().unwrap();
    assert_eq!(issue.severity, Severity::Warning);
    assert!(issue.message.contains("10.0%"));
}

#[test]
fn test_always_failing_tool_not_intermittent() {
    let events = (0..4).map(|i| post("s1", i, "Task", "error")).collect();
    let report = audit(events);
    assert_eq!(report.issues_of_type("intermittent_tool_failure").count(), 0);
}

#[test]
fn test_never_failing_tool_not_intermittent() {
    let events = (0..4).map(|i| post("s1", i, "Read", "success")).collect();
    let report = audit(events);
    assert_eq!(report.issues_of_type("intermittent_tool_failure").count(), 0);
}

#[test]
fn test_single_call_not_judged() {
    let events = vec![post("s1", 0, "Bash", "error")];
    let report = audit(events);
    assert_eq!(report.issues_of_type("intermittent_tool_failure").count(), 0);
}

#[test]
fn test_custom_threshold() {
    let mut events: Vec<Event> = (0..10).map(|i| post("s1", i, "Grep", "success")).collect();
    events[0] = post("s1", 0, "Grep", "error");
    let trace = TraceSet::from_events(events);
    let config = AuditConfig {
        intermittency_threshold: 0.2,
        ..only(&[AuditPass::Intermittency])
    };
    assert!(run_audit(&trace, None, &config).issues.is_empty());
}

#[test]
fn test_interrupted_write_is_unpaired() {
    let events = vec![
        Event::new("s1", "2025-01-01T10:00:00Z", EventType::SessionStart),
        Event::new("s1", "2025-01-01T10:00:01Z", EventType::PreToolUse).with_tool("Write"),
        Event::new("s1", "2025-01-01T10:00:05Z", EventType::Stop),
    ];
    let report = audit(events);
    let unpaired: Vec<_> = report.issues_of_type("unpaired_pretooluse").collect();
    assert_eq!(unpaired.len(), 1);
    assert_eq!(unpaired[0].severity, Severity::Warning);
    assert_eq!(
        unpaired[0].message,
        "PreToolUse for 'Write' has no matching PostToolUse"
    );
    assert_eq!(
        unpaired[0].kind,
        IssueKind::UnpairedPretooluse {
            tool: "Write".to_string(),
            session_id: "s1".to_string(),
            timestamp: "2025-01-01T10:00:01Z".to_string(),
        }
    );
}

#[test]
fn test_edit_oscillation() {
    let statuses = ["success", "error", "success", "error", "success"];
    let events = statuses
        .iter()
        .enumerate()
        .map(|(i, status)| post("s1", i as u32, "Edit", status))
        .collect();
    let report = audit(events);
    let issue = report.issues_of_type("oscillating_errors").next().unwrap();
    assert_eq!(issue.severity, Severity::Warning);
    match &issue.kind {
        IssueKind::OscillatingErrors {
            tool,
            pattern,
            change_rate,
            changes,
            ..
        } => {
            assert_eq!(tool, "Edit");
            assert_eq!(pattern, "success->error->success->error->success");
            assert_eq!(*change_rate, 100.0);
            assert_eq!(*changes, 4);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn test_few_flips_not_oscillation() {
    // 2 changes over 4 observations: rate 0.67 but below the count gate
    let statuses = ["success", "error", "success", "success"];
    let events = statuses
        .iter()
        .enumerate()
        .map(|(i, status)| post("s1", i as u32, "Edit", status))
        .collect();
    let report = audit(events);
    assert_eq!(report.issues_of_type("oscillating_errors").count(), 0);
}

#[test]
fn test_oscillation_is_per_session() {
    let mut events = Vec::new();
    for (i, status) in ["success", "error", "success"].iter().enumerate() {
        events.push(post("a", i as u32, "Edit", status));
        events.push(post("b", i as u32 + 10, "Edit", status));
    }
    let report = audit(events);
    assert_eq!(report.issues_of_type("oscillating_errors").count(), 0);
}

#[test]
fn test_oscillation_pattern_truncated() {
    let events = (0..14)
        .map(|i| post("s1", i, "Bash", if i % 2 == 0 { "success" } else { "error" }))
        .collect();
    let report = audit(events);
    let issue = report.issues_of_type("oscillating_errors").next().unwrap();
    if let IssueKind::OscillatingErrors { pattern, .. } = &issue.kind {
        assert_eq!(pattern.split("->").count(), 10);
    }
}

#[test]
fn test_session_instability() {
    let events = vec![
        Event::new("s1", "2025-01-01T10:00:00Z", EventType::SessionStart),
        Event::new("s1", "2025-01-01T10:01:00Z", EventType::SessionStart),
        Event::new("s1", "2025-01-01T10:02:00Z", EventType::SessionStart),
        Event::new("s1", "2025-01-01T10:03:00Z", EventType::Stop),
    ];
    let report = audit(events);
    let issue = report.issues_of_type("session_instability").next().unwrap();
    assert_eq!(issue.severity, Severity::Info);
    assert_eq!(issue.message, "Session has 3 starts but only 1 ends");
}

#[test]
fn test_one_open_session_is_stable() {
    let events = vec![
        Event::new("s1", "2025-01-01T10:00:00Z", EventType::SessionStart),
        Event::new("s1", "2025-01-01T10:01:00Z", EventType::SessionStart),
        Event::new("s1", "2025-01-01T10:03:00Z", EventType::SessionEnd),
    ];
    let report = audit(events);
    assert_eq!(report.issues_of_type("session_instability").count(), 0);
}

#[test]
fn test_empty_trace_is_no_data() {
    let report = run_audit(
        &TraceSet::new(),
        Some(&IndexStatus::Missing),
        &AuditConfig::default(),
    );
    assert_eq!(report.status, AuditStatus::NoData);
    assert!(report.issues.is_empty());
    assert_eq!(report.summary.total_issues, 0);
}

#[test]
fn test_pass_selection_and_dedup() {
    let events = vec![
        Event::new("s1", "2025-01-01T10:00:01Z", EventType::PreToolUse).with_tool("Write"),
        Event::new("s1", "yesterday", EventType::Stop),
    ];
    let trace = TraceSet::from_events(events);
    let config = only(&[AuditPass::Timestamps, AuditPass::Timestamps]);
    let report = run_audit(&trace, None, &config);
    assert_eq!(report.passes, vec![AuditPass::Timestamps]);
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].type_name(), "invalid_timestamp_format");
}

#[test]
fn test_invalid_json_reported_critical() {
    let data = b"{\"timestamp\":\"2025-01-01T10:00:00Z\",\"event_type\":\"Stop\"}\n{oops\n";
    let trace = crate::loader::parse_trace_bytes(data, "session_x.jsonl");
    let report = run_audit(&trace, None, &only(&[AuditPass::Schema]));
    let issue = report.issues_of_type("invalid_json").next().unwrap();
    assert_eq!(issue.severity, Severity::Critical);
    assert_eq!(issue.message, "Invalid JSON at line 2 in session_x.jsonl");
    assert!(report.has_critical());
}

#[test]
fn test_truncated_tail_not_reported() {
    let data = b"{\"timestamp\":\"2025-01-01T10:00:00Z\",\"event_type\":\"Stop\"}\n{\"time";
    let trace = crate::loader::parse_trace_bytes(data, "session_x.jsonl");
    let report = run_audit(&trace, None, &only(&[AuditPass::Schema]));
    assert_eq!(report.issues_of_type("invalid_json").count(), 0);
}

#[test]
fn test_unknown_event_type_skips_field_checks() {
    let events = vec![Event::new("s1", "2025-01-01T10:00:00Z", EventType::Other("Boom".into()))
        .with_status("weird")];
    let trace = TraceSet::from_events(events);
    let report = run_audit(&trace, None, &only(&[AuditPass::Schema]));
    assert_eq!(report.issues.len(), 1);
    assert_eq!(report.issues[0].message, "Unknown event type: 'Boom'");
}

#[test]
fn test_missing_fields_and_status() {
    let events = vec![Event::new("s1", "2025-01-01T10:00:00Z", EventType::PostToolUse)
        .with_tool("Read")
        .with_status("kaput")];
    let trace = TraceSet::from_events(events);
    let report = run_audit(&trace, None, &only(&[AuditPass::Schema]));

    let missing = report.issues_of_type("missing_required_fields").next().unwrap();
    assert_eq!(missing.message, "Event missing required fields: [\"event_id\"]");
    let status = report.issues_of_type("invalid_status_value").next().unwrap();
    assert_eq!(status.severity, Severity::Info);
}

#[test]
fn test_duplicate_and_non_uuid_ids() {
    let events = vec![
        Event::new("s1", "2025-01-01T10:00:00Z", EventType::Stop).with_id("abc"),
        Event::new("s1", "2025-01-01T10:00:01Z", EventType::Stop).with_id("abc"),
        Event::new("s1", "2025-01-01T10:00:02Z", EventType::Stop)
            .with_id("123e4567-e89b-12d3-a456-426614174000"),
    ];
    let trace = TraceSet::from_events(events);

    let relaxed = run_audit(&trace, None, &only(&[AuditPass::EventIds]));
    assert_eq!(relaxed.issues.len(), 1);
    assert_eq!(relaxed.issues[0].type_name(), "duplicate_event_id");

    let strict = AuditConfig {
        strict: true,
        ..only(&[AuditPass::EventIds])
    };
    let report = run_audit(&trace, None, &strict);
    assert_eq!(report.issues_of_type("non_uuid_event_id").count(), 2);
    assert_eq!(report.issues_of_type("duplicate_event_id").count(), 1);
}

#[test]
fn test_error_message_quality() {
    let mut events = vec![
        post("s1", 0, "Bash", "error"),
        post("s1", 1, "Bash", "error").with_error_message("Failed"),
    ];
    for i in 0..6 {
        events.push(
            post("s1", 10 + i, "Bash", "error")
                .with_error_message(&format!(
                    "Command timed out after 120 seconds while waiting for output (attempt {i})"
                )),
        );
    }
    let trace = TraceSet::from_events(events);
    let report = run_audit(&trace, None, &only(&[AuditPass::ErrorMessages]));

    assert_eq!(report.issues_of_type("empty_error_message").count(), 1);
    assert_eq!(report.issues_of_type("generic_error_message").count(), 1);
    let frequent = report.issues_of_type("frequent_error").next().unwrap();
    assert_eq!(
        frequent.kind,
        IssueKind::FrequentError {
            error_pattern: "command timed out after 120 seconds while waiting ".to_string(),
            occurrence_count: 6,
        }
    );
}

#[test]
fn test_error_prefix_is_fifty_chars_case_folded() {
    let long = "X".repeat(80);
    assert_eq!(compliance::error_prefix(&long), "x".repeat(50));
}

#[test]
fn test_tool_name_case_mismatch() {
    let events = vec![
        post("s1", 0, "bash", "success"),
        post("s1", 1, "bash", "success"),
        post("s1", 2, "Bash", "success"),
        post("s1", 3, "mcp__custom", "success"),
    ];
    let trace = TraceSet::from_events(events);
    let report = run_audit(&trace, None, &only(&[AuditPass::ToolNames]));
    assert_eq!(report.issues.len(), 1);
    assert_eq!(
        report.issues[0].kind,
        IssueKind::ToolNameCaseMismatch {
            found: "bash".to_string(),
            expected: "Bash".to_string(),
            count: 2,
        }
    );
}

#[test]
fn test_sessions_index_only_for_directories() {
    let events = vec![post("s1", 0, "Read", "success")];
    let trace = TraceSet::from_events(events);
    let config = only(&[AuditPass::SessionsIndex]);

    assert!(run_audit(&trace, None, &config).issues.is_empty());

    let report = run_audit(&trace, Some(&IndexStatus::Missing), &config);
    assert_eq!(report.issues[0].type_name(), "missing_sessions_index");
    assert_eq!(report.issues[0].severity, Severity::Warning);

    let invalid = IndexStatus::parse("{not json");
    let report = run_audit(&trace, Some(&invalid), &config);
    assert_eq!(report.issues[0].severity, Severity::Critical);

    let list = IndexStatus::parse("[1, 2]");
    let report = run_audit(&trace, Some(&list), &config);
    assert_eq!(report.issues[0].type_name(), "invalid_sessions_index_structure");
}

#[test]
fn test_incomplete_metadata_strict_only() {
    let events = vec![post("s1", 0, "Read", "success")];
    let trace = TraceSet::from_events(events);
    let index = IndexStatus::parse(r#"{"s1": {"started_at": "2025-01-01T10:00:00Z"}}"#);

    let relaxed = run_audit(&trace, Some(&index), &only(&[AuditPass::SessionsIndex]));
    assert!(relaxed.issues.is_empty());

    let strict = AuditConfig {
        strict: true,
        ..only(&[AuditPass::SessionsIndex])
    };
    let report = run_audit(&trace, Some(&index), &strict);
    assert_eq!(
        report.issues[0].kind,
        IssueKind::IncompleteSessionMetadata {
            session_id: "s1".to_string(),
            missing: vec!["event_count".to_string()],
        }
    );
}

#[test]
fn test_summary_matches_issues() {
    let events = (0..10)
        .map(|i| post("s1", i, "Bash", if i < 3 { "error" } else { "success" }))
        .collect();
    let report = audit(events);
    assert_eq!(report.status, AuditStatus::Completed);
    assert_eq!(report.total_events_analyzed, 10);
    assert_eq!(report.summary.total_issues, report.issues.len());
    assert_eq!(
        report.summary.critical + report.summary.warning + report.summary.info,
        report.issues.len()
    );
}

#[test]
fn test_audit_pass_names_round_trip() {
    for pass in AuditPass::ALL {
        let json = serde_json::to_string(&pass).unwrap();
        assert_eq!(json, format!("\"{}\"", pass.as_str()));
    }
}
